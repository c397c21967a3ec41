//! Idle/Active save toggle guarding the persistence resource

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::capture::Frame;
use crate::error::PipelineError;
use crate::persist::PersistenceSink;

/// Outcome of a save-state transition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Stopped,
    /// `start` while already saving; nothing changed
    AlreadyActive,
    /// `stop` while idle; nothing changed
    NotActive,
}

/// Outcome of [`SaveController::append`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Written,
    /// Saving was off when the frame arrived
    Skipped,
}

/// Shared save-state: the `saving` flag and the sink it gates.
///
/// Every transition and every append runs under one mutex, and the flag is
/// only flipped while that mutex is held, so `is_active() == true` always
/// means the sink is open.
pub struct SaveController<P> {
    sink: Mutex<P>,
    active: AtomicBool,
}

impl<P: PersistenceSink> SaveController<P> {
    pub fn new(sink: P) -> Self {
        Self {
            sink: Mutex::new(sink),
            active: AtomicBool::new(false),
        }
    }

    /// Lock-free read of the current flag
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn start(&self) -> Result<Transition, PipelineError> {
        let mut sink = self.lock();
        if self.active.load(Ordering::Acquire) {
            return Ok(Transition::AlreadyActive);
        }

        sink.open().map_err(PipelineError::PersistenceOpenFailed)?;
        self.active.store(true, Ordering::Release);
        info!("Started saving");
        Ok(Transition::Started)
    }

    pub fn stop(&self) -> Result<Transition, PipelineError> {
        let mut sink = self.lock();
        if !self.active.load(Ordering::Acquire) {
            return Ok(Transition::NotActive);
        }

        self.active.store(false, Ordering::Release);
        if let Err(e) = sink.close() {
            warn!("Failed to close recording cleanly: {}", e);
        }
        info!("Stopped saving");
        Ok(Transition::Stopped)
    }

    pub fn toggle(&self) -> Result<Transition, PipelineError> {
        if self.is_active() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Append under the transition lock; a frame racing a `stop` is skipped.
    pub fn append(&self, frame: &Frame) -> Result<Appended, PipelineError> {
        let mut sink = self.lock();
        if !self.active.load(Ordering::Acquire) {
            return Ok(Appended::Skipped);
        }

        sink.append(frame)
            .map_err(PipelineError::PersistenceWriteFailed)?;
        Ok(Appended::Written)
    }

    /// Stop any active recording and finalize the sink. Repeatable.
    pub fn finalize(&self) -> Result<(), PipelineError> {
        self.stop()?;
        self.lock()
            .finalize()
            .map_err(PipelineError::PersistenceWriteFailed)
    }

    pub fn into_inner(self) -> P {
        self.sink.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, P> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
