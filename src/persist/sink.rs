use crate::capture::Frame;
use crate::error::PersistenceError;

/// Durable storage for saved frames.
///
/// The destination is fixed when the sink is built; `open` and `close` bracket
/// one recording. Only the [`SaveController`](crate::persist::SaveController)
/// calls `open`/`close`.
pub trait PersistenceSink: Send {
    fn open(&mut self) -> Result<(), PersistenceError>;

    fn append(&mut self, frame: &Frame) -> Result<(), PersistenceError>;

    /// Flush and close the current recording. Closing a closed sink is a no-op.
    fn close(&mut self) -> Result<(), PersistenceError>;

    fn is_open(&self) -> bool;

    /// Called once at shutdown, after the last possible `append`
    fn finalize(&mut self) -> Result<(), PersistenceError> {
        self.close()
    }
}

impl<P: PersistenceSink + ?Sized> PersistenceSink for Box<P> {
    fn open(&mut self) -> Result<(), PersistenceError> {
        (**self).open()
    }

    fn append(&mut self, frame: &Frame) -> Result<(), PersistenceError> {
        (**self).append(frame)
    }

    fn close(&mut self) -> Result<(), PersistenceError> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn finalize(&mut self) -> Result<(), PersistenceError> {
        (**self).finalize()
    }
}
