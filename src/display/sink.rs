use crate::capture::Frame;
use crate::error::DisplayError;

/// Operator command delivered through the display's input poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    None,
    ToggleSave,
    Quit,
}

impl Command {
    /// Map an operator keypress to a command
    pub fn from_key(key: char) -> Self {
        match key.to_ascii_lowercase() {
            's' => Command::ToggleSave,
            'q' => Command::Quit,
            _ => Command::None,
        }
    }
}

/// Text overlaid on the preview to show save status
pub fn status_text(saving: bool) -> &'static str {
    if saving {
        "Saving Video"
    } else {
        "Not Saving"
    }
}

/// Consumer of displayed frames and source of operator commands.
///
/// Only the coordinator's thread touches a display, so implementors need not
/// be `Send`.
pub trait DisplaySink {
    fn render(&mut self, frame: &Frame, saving: bool) -> Result<(), DisplayError>;

    /// Return immediately with at most one pending command
    fn poll_command(&mut self) -> Command;

    fn close(&mut self) {}
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn render(&mut self, frame: &Frame, saving: bool) -> Result<(), DisplayError> {
        (**self).render(frame, saving)
    }

    fn poll_command(&mut self) -> Command {
        (**self).poll_command()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
