use crate::ActivationCallback;
use crate::DeliveredActivation;
use crate::Error;
use crate::Identity;
use crate::RegistryBackend;
use std::collections::HashMap;
use zbus::Connection;
use zbus::interface;

const ENTRY_POINT_PATH: &str = "/org/desktoptoasts/Activation";

/// Make a D-Bus compatible well-known name from an application id
fn bus_name_for(app_id: &str) -> String {
    let mut sanitized: String = app_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }

    format!("org.desktoptoasts.{}", sanitized)
}

/// Session-bus registry backend.
///
/// `publish_identity` claims the application's well-known name;
/// `bind_entry_point` serves the activation object under it. With a
/// matching D-Bus service file installed, the bus can launch the
/// application when an activation arrives and no process is alive.
pub struct DBusBackend {
    connection: Option<Connection>,
}

impl DBusBackend {
    pub fn new() -> Self {
        DBusBackend { connection: None }
    }
}

impl Default for DBusBackend {
    fn default() -> Self {
        DBusBackend::new()
    }
}

impl RegistryBackend for DBusBackend {
    async fn publish_identity(&mut self, identity: &Identity) -> Result<(), Error> {
        let bus_name = bus_name_for(&identity.app_id);
        let connection = match &self.connection {
            Some(connection) => connection.clone(),
            None => {
                let connection = Connection::session().await?;
                self.connection = Some(connection.clone());
                connection
            }
        };

        let reply = zbus::fdo::DBusProxy::new(&connection)
            .await?
            .request_name(
                zbus::names::WellKnownName::from_string_unchecked(bus_name.clone()),
                zbus::fdo::RequestNameFlags::DoNotQueue.into(),
            )
            .await?;

        match reply {
            zbus::fdo::RequestNameReply::PrimaryOwner
            | zbus::fdo::RequestNameReply::AlreadyOwner => {
                log::trace!(
                    "Published identity {} ({}) as {}",
                    identity.app_id,
                    identity.display_name,
                    bus_name
                );
                Ok(())
            }
            zbus::fdo::RequestNameReply::Exists => Err(Error::DBus(format!(
                "Activation name {} is owned by another process",
                bus_name
            ))),
            _ => Err(Error::DBus(
                "Unexpected reply when requesting name".to_string(),
            )),
        }
    }

    async fn bind_entry_point(
        &mut self,
        identity: &Identity,
        on_activation: ActivationCallback,
    ) -> Result<(), Error> {
        let connection = self.connection.as_ref().ok_or(Error::NotRegistered)?;
        let service = ActivationService {
            app_id: identity.app_id.clone(),
            on_activation,
        };
        connection
            .object_server()
            .at(ENTRY_POINT_PATH, service)
            .await?;
        log::trace!("Activation entry point served at {}", ENTRY_POINT_PATH);
        Ok(())
    }
}

struct ActivationService {
    app_id: String,
    on_activation: ActivationCallback,
}

#[interface(name = "org.desktoptoasts.Activation1")]
impl ActivationService {
    /// Called by the external trigger system when the user interacts with
    /// a notification addressed to this application.
    fn activate(&self, payload: String, user_input: HashMap<String, String>) {
        log::trace!("Entry point activated for {}: {:?}", self.app_id, payload);
        (self.on_activation)(DeliveredActivation {
            payload,
            user_input,
        });
    }
}
