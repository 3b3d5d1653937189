use activation::Notifier;
use activation_registry::ActivationRegistry;
use activation_registry::RegistryBackend;

/// Submits background-action confirmations.
///
/// Rendering notification visuals is out of scope here, so this variant
/// logs the toast it would submit, but it still checks the registration
/// precondition the way any real submitter must.
pub struct ToastNotifier<B> {
    registry: ActivationRegistry<B>,
}

impl<B> ToastNotifier<B> {
    pub fn new(registry: ActivationRegistry<B>) -> Self {
        ToastNotifier { registry }
    }
}

impl<B: RegistryBackend> Notifier for ToastNotifier<B> {
    fn notify(&mut self, message: &str) {
        if let Err(err) = self.registry.ensure_registered() {
            log::error!("Cannot submit notification: {}", err);
            return;
        }
        println!("[toast] {}", message);
    }
}
