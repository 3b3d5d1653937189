use activation::Presentation;

/// Console stand-in for the real window.
///
/// Tracks the open-surface count the dispatcher's exit rule reads and
/// prints what a window would render.
pub struct ConsoleWindow {
    open_surfaces: usize,
}

impl ConsoleWindow {
    pub fn new() -> Self {
        ConsoleWindow { open_surfaces: 0 }
    }

    fn show_message(&self, message: &str) {
        println!("[window] {}", message);
    }
}

impl Presentation for ConsoleWindow {
    fn ensure_surface(&mut self) {
        if self.open_surfaces == 0 {
            self.open_surfaces = 1;
            self.show_message("Opened main window");
        }
    }

    fn foreground_surface(&mut self) {
        self.show_message("Window brought to foreground");
    }

    fn show_conversation(&mut self, conversation_id: i64) {
        self.show_message(&format!("Viewing conversation {}", conversation_id));
    }

    fn show_image(&mut self, image_url: &str) {
        self.show_message(&format!("Showing image: {}", image_url));
    }

    fn open_surfaces(&self) -> usize {
        self.open_surfaces
    }
}
