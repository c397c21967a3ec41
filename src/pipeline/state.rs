use std::sync::atomic::{AtomicBool, Ordering};

/// One-way running flag observed by the persistence worker
#[derive(Debug)]
pub struct RunState {
    running: AtomicBool,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clear the flag. Returns `true` only for the call that flipped it.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
