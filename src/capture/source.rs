use crate::capture::Frame;
use crate::error::SourceError;

/// A device that produces one frame per request.
///
/// Opening happens in the implementor's constructor. `capture` may block on
/// hardware latency and is not required to be reentrant; the pipeline only
/// ever calls it through a [`CaptureGate`](crate::capture::CaptureGate).
pub trait FrameSource: Send {
    fn capture(&mut self) -> Result<Frame, SourceError>;

    /// Release device resources. Captures after `close` return [`SourceError::Closed`].
    fn close(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture(&mut self) -> Result<Frame, SourceError> {
        (**self).capture()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
