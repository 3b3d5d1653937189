use crate::Error;
use std::collections::HashMap;
use std::sync::Arc;

/// Identity metadata the external trigger system uses to address this
/// application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub app_id: String,
    pub display_name: String,
    pub icon_path: String,
}

/// One activation delivered through the registered entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveredActivation {
    pub payload: String,
    /// Values the user typed or selected on the originating surface.
    pub user_input: HashMap<String, String>,
}

/// Invoked for every activation the external trigger system delivers.
pub type ActivationCallback = Arc<dyn Fn(DeliveredActivation) + Send + Sync + 'static>;

/// OS binding behind the registry: publishes the identity and exposes the
/// activation entry point.
///
/// Implemented for the session bus in dbus_backend.rs; tests use an
/// in-memory backend.
#[allow(async_fn_in_trait)]
pub trait RegistryBackend {
    async fn publish_identity(&mut self, identity: &Identity) -> Result<(), Error>;

    async fn bind_entry_point(
        &mut self,
        identity: &Identity,
        on_activation: ActivationCallback,
    ) -> Result<(), Error>;
}

/// Makes the application invocable by an external trigger system whether
/// or not a process is currently running.
///
/// Registration state lives on this one instance, constructed once at
/// process start and passed by reference to collaborators. Initialization
/// order: `register_identity`, then `register_entry_point`, before any
/// activation traffic is expected; `ensure_registered` guards outbound
/// operations against skipping either step.
pub struct ActivationRegistry<B> {
    backend: B,
    identity: Option<Identity>,
    entry_point_registered: bool,
}

impl<B: RegistryBackend> ActivationRegistry<B> {
    pub fn new(backend: B) -> Self {
        ActivationRegistry {
            backend,
            identity: None,
            entry_point_registered: false,
        }
    }

    /// Registers identity metadata. Idempotent: re-registering the same
    /// identity is a no-op.
    pub async fn register_identity(
        &mut self,
        app_id: &str,
        display_name: &str,
        icon_path: &str,
    ) -> Result<(), Error> {
        if app_id.is_empty() {
            return Err(Error::InvalidArgument("app_id"));
        }
        if display_name.is_empty() {
            return Err(Error::InvalidArgument("display_name"));
        }
        if icon_path.is_empty() {
            return Err(Error::InvalidArgument("icon_path"));
        }

        let identity = Identity {
            app_id: app_id.to_string(),
            display_name: display_name.to_string(),
            icon_path: icon_path.to_string(),
        };
        if self.identity.as_ref() == Some(&identity) {
            log::trace!("Identity {} already registered", identity.app_id);
            return Ok(());
        }

        self.backend.publish_identity(&identity).await?;
        self.identity = Some(identity);
        Ok(())
    }

    /// Exposes the activation entry point so the external trigger system
    /// can reach this application, launching a process when none is
    /// alive. Requires `register_identity` to have completed.
    pub async fn register_entry_point(
        &mut self,
        on_activation: ActivationCallback,
    ) -> Result<(), Error> {
        let identity = self.identity.as_ref().ok_or(Error::NotRegistered)?;
        self.backend.bind_entry_point(identity, on_activation).await?;
        self.entry_point_registered = true;
        Ok(())
    }

    /// Precondition guard for outbound operations (e.g. submitting a
    /// notification): fails fast instead of producing a downstream OS
    /// error.
    pub fn ensure_registered(&self) -> Result<(), Error> {
        if self.identity.is_some() && self.entry_point_registered {
            Ok(())
        } else {
            Err(Error::NotRegistered)
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBackend {
        published: Vec<Identity>,
        entry_points_bound: usize,
    }

    impl RegistryBackend for RecordingBackend {
        async fn publish_identity(&mut self, identity: &Identity) -> Result<(), Error> {
            self.published.push(identity.clone());
            Ok(())
        }

        async fn bind_entry_point(
            &mut self,
            _identity: &Identity,
            _on_activation: ActivationCallback,
        ) -> Result<(), Error> {
            self.entry_points_bound += 1;
            Ok(())
        }
    }

    fn noop_callback() -> ActivationCallback {
        Arc::new(|_| {})
    }

    #[tokio::test]
    async fn register_identity_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let mut registry = ActivationRegistry::new(RecordingBackend::default());

        registry
            .register_identity("org.example.Toasts", "Desktop toasts app", "/tmp/icon.png")
            .await?;
        registry
            .register_identity("org.example.Toasts", "Desktop toasts app", "/tmp/icon.png")
            .await?;

        assert_eq!(registry.backend.published.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn empty_identity_fields_are_rejected() {
        let mut registry = ActivationRegistry::new(RecordingBackend::default());

        let result = registry.register_identity("", "name", "icon").await;
        assert!(matches!(result, Err(Error::InvalidArgument("app_id"))));

        let result = registry.register_identity("id", "", "icon").await;
        assert!(matches!(result, Err(Error::InvalidArgument("display_name"))));

        let result = registry.register_identity("id", "name", "").await;
        assert!(matches!(result, Err(Error::InvalidArgument("icon_path"))));

        assert!(registry.backend.published.is_empty());
    }

    #[tokio::test]
    async fn entry_point_requires_identity_first() {
        let mut registry = ActivationRegistry::new(RecordingBackend::default());

        let result = registry.register_entry_point(noop_callback()).await;
        assert!(matches!(result, Err(Error::NotRegistered)));
    }

    #[tokio::test]
    async fn ensure_registered_guards_both_steps() -> Result<(), Box<dyn std::error::Error>> {
        let mut registry = ActivationRegistry::new(RecordingBackend::default());
        assert!(matches!(
            registry.ensure_registered(),
            Err(Error::NotRegistered)
        ));

        registry
            .register_identity("org.example.Toasts", "Desktop toasts app", "/tmp/icon.png")
            .await?;
        assert!(matches!(
            registry.ensure_registered(),
            Err(Error::NotRegistered)
        ));

        registry.register_entry_point(noop_callback()).await?;
        assert!(registry.ensure_registered().is_ok());
        Ok(())
    }
}
