mod api;
mod arguments;
mod dispatcher;
mod event;
mod payload;
pub use api::*;
pub use arguments::*;
pub use dispatcher::*;
pub use event::*;
pub use payload::*;
