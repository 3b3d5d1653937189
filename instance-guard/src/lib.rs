use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use zbus::Connection;

#[derive(Debug)]
pub enum Error {
    DBus(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DBus(e) => write!(f, "D-Bus error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<zbus::Error> for Error {
    fn from(e: zbus::Error) -> Self {
        Error::DBus(e.to_string())
    }
}

impl From<zbus::fdo::Error> for Error {
    fn from(e: zbus::fdo::Error) -> Self {
        Error::DBus(e.to_string())
    }
}

/// Make a unique D-Bus compatible bus name from an arbitrary identity key
fn sanitize_bus_name(identity_key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    identity_key.hash(&mut hasher);
    let hash = hasher.finish();

    format!("org.desktoptoasts.Instance{:x}", hash)
}

/// Process-wide exclusive ownership of an identity key.
///
/// Holds a session-bus well-known name for as long as the guard (and its
/// bus connection) lives. The bus revokes the name when the owning
/// process exits, crash included, so a dead owner can never strand the
/// lock. Acquire once, early in startup, before binding the activation
/// channel.
pub struct InstanceGuard {
    bus_name: String,
    // Owning this connection is what keeps the name held
    _connection: Connection,
}

impl InstanceGuard {
    /// Attempts to become the sole owner of `identity_key`. Non-blocking
    /// beyond the bus round-trip.
    ///
    /// Returns `Ok(Some(guard))` iff this call created the ownership
    /// token. `Ok(None)` means another live process already owns it, the
    /// expected non-owner path with no side effects.
    pub async fn try_acquire(identity_key: &str) -> Result<Option<InstanceGuard>, Error> {
        let bus_name = sanitize_bus_name(identity_key);
        let connection = Connection::session().await?;
        let reply = zbus::fdo::DBusProxy::new(&connection)
            .await?
            .request_name(
                zbus::names::WellKnownName::from_string_unchecked(bus_name.clone()),
                zbus::fdo::RequestNameFlags::DoNotQueue.into(),
            )
            .await?;

        match reply {
            zbus::fdo::RequestNameReply::PrimaryOwner => {
                log::trace!("Acquired instance ownership as {}", bus_name);
                Ok(Some(InstanceGuard {
                    bus_name,
                    _connection: connection,
                }))
            }
            zbus::fdo::RequestNameReply::Exists => {
                log::trace!("Instance ownership {} held by another process", bus_name);
                Ok(None)
            }
            _ => Err(Error::DBus(
                "Unexpected reply when requesting name".to_string(),
            )),
        }
    }

    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_names_are_stable_and_distinct() {
        let a1 = sanitize_bus_name("~/.config/toasts/app");
        let a2 = sanitize_bus_name("~/.config/toasts/app");
        let b = sanitize_bus_name("~/.config/toasts/other");

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert!(a1.starts_with("org.desktoptoasts.Instance"));
        // Hashing keeps arbitrary keys within D-Bus name rules
        assert!(a1.chars().all(|c| c.is_ascii_alphanumeric() || c == '.'));
    }

    #[tokio::test]
    #[ignore = "requires a session D-Bus"]
    async fn exactly_one_concurrent_acquire_wins() -> Result<(), Box<dyn std::error::Error>> {
        let key = format!("instance-guard-test-{}", std::process::id());

        let attempts = acquire_concurrently(&key).await?;
        let owners = attempts.iter().filter(|g| g.is_some()).count();
        assert_eq!(owners, 1);
        Ok(())
    }

    async fn acquire_concurrently(
        key: &str,
    ) -> Result<Vec<Option<InstanceGuard>>, Error> {
        let (a, b, c) = tokio::join!(
            InstanceGuard::try_acquire(key),
            InstanceGuard::try_acquire(key),
            InstanceGuard::try_acquire(key),
        );
        Ok(vec![a?, b?, c?])
    }
}
