pub mod console;
pub mod sink;

#[cfg(feature = "sdl2-display")]
pub mod display;

pub use console::ConsoleDisplay;
pub use sink::{status_text, Command, DisplaySink};

#[cfg(feature = "sdl2-display")]
pub use display::Sdl2Display;
