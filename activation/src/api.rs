/// Capabilities the presentation layer exposes to the dispatcher.
///
/// Implemented by whatever renders the UI (a real window, or the console
/// variant in the demo app). `open_surfaces` backs the zero-surfaces exit
/// rule after background actions, so it must reflect every surface the
/// implementation has created and not yet closed.
pub trait Presentation {
    /// Makes sure at least one UI surface exists, creating one if needed.
    fn ensure_surface(&mut self);

    /// Brings the surface to the foreground, restoring it if minimized.
    fn foreground_surface(&mut self);

    fn show_conversation(&mut self, conversation_id: i64);

    fn show_image(&mut self, image_url: &str);

    /// Number of currently open UI surfaces.
    fn open_surfaces(&self) -> usize;
}

/// Confirmation-artifact collaborator for background actions.
///
/// The real implementation submits a notification and is expected to
/// check `ActivationRegistry::ensure_registered` before submitting.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}
