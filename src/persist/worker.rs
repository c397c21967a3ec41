//! Background thread appending frames to the persistence sink

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use crate::capture::{CaptureGate, Frame, FrameSource};
use crate::error::PipelineError;
use crate::persist::save_state::Appended;
use crate::persist::{PersistenceSink, SaveController};
use crate::pipeline::{PipelineStats, RunState};

/// Lifecycle of the persistence worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Running = 0,
    Stopping = 1,
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Running,
            1 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

/// Why the worker loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Run-state was cleared
    Cancelled,
    /// The worker's own capture failed
    CaptureFailed,
    /// The hand-off queue was dropped while the pipeline was still running
    HandoffClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub exit: WorkerExit,
    pub frames_persisted: u64,
    pub write_failures: u64,
}

/// Message on the fan-out hand-off queue
pub enum Handoff {
    Frame(Frame),
    /// Acknowledged once every earlier frame has been handled
    Flush(Sender<()>),
}

/// Where the worker gets its frames
pub enum FrameFeed<S> {
    /// Capture independently through the shared gate
    Capture(Arc<CaptureGate<S>>),
    /// Receive frames the coordinator already captured
    Handoff(Receiver<Handoff>),
}

pub struct PersistenceWorker<S, P> {
    feed: FrameFeed<S>,
    save: Arc<SaveController<P>>,
    running: Arc<RunState>,
    stats: Arc<PipelineStats>,
    interval: Duration,
    state: Arc<AtomicU8>,
    frames_persisted: u64,
    write_failures: u64,
}

impl<S, P> PersistenceWorker<S, P>
where
    S: FrameSource + 'static,
    P: PersistenceSink + 'static,
{
    pub fn new(
        feed: FrameFeed<S>,
        save: Arc<SaveController<P>>,
        running: Arc<RunState>,
        stats: Arc<PipelineStats>,
        interval: Duration,
    ) -> Self {
        Self {
            feed,
            save,
            running,
            stats,
            interval,
            state: Arc::new(AtomicU8::new(WorkerState::Running as u8)),
            frames_persisted: 0,
            write_failures: 0,
        }
    }

    pub fn spawn(self) -> Result<WorkerHandle, PipelineError> {
        let state = Arc::clone(&self.state);
        let thread = thread::Builder::new()
            .name("persistence".into())
            .spawn(move || self.run())
            .map_err(|e| PipelineError::acquisition("persistence worker", e))?;

        Ok(WorkerHandle { state, thread })
    }

    fn run(mut self) -> WorkerReport {
        info!("Persistence worker started");
        let exit = match &self.feed {
            FrameFeed::Capture(gate) => {
                let gate = Arc::clone(gate);
                self.capture_loop(&gate)
            }
            FrameFeed::Handoff(rx) => {
                let rx = rx.clone();
                self.handoff_loop(&rx)
            }
        };

        self.set_state(WorkerState::Stopping);
        info!(
            ?exit,
            "Persistence worker exiting after {} frames",
            self.frames_persisted
        );
        let report = WorkerReport {
            exit,
            frames_persisted: self.frames_persisted,
            write_failures: self.write_failures,
        };
        self.set_state(WorkerState::Stopped);
        report
    }

    fn capture_loop(&mut self, gate: &CaptureGate<S>) -> WorkerExit {
        loop {
            if !self.running.is_running() {
                return WorkerExit::Cancelled;
            }

            match gate.capture() {
                Ok(frame) => self.persist(&frame),
                Err(e) => {
                    error!("Failed to capture frame for encoding: {}", e);
                    return WorkerExit::CaptureFailed;
                }
            }

            thread::sleep(self.interval);
        }
    }

    fn handoff_loop(&mut self, rx: &Receiver<Handoff>) -> WorkerExit {
        loop {
            match rx.recv_timeout(self.interval) {
                Ok(Handoff::Frame(frame)) => self.persist(&frame),
                Ok(Handoff::Flush(ack)) => {
                    let _ = ack.send(());
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Queue is empty here, so nothing is left behind
                    if !self.running.is_running() {
                        return WorkerExit::Cancelled;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return if self.running.is_running() {
                        WorkerExit::HandoffClosed
                    } else {
                        WorkerExit::Cancelled
                    };
                }
            }
        }
    }

    fn persist(&mut self, frame: &Frame) {
        match self.save.append(frame) {
            Ok(Appended::Written) => {
                self.frames_persisted += 1;
                self.stats.record_persisted();
                debug!(sequence = frame.sequence(), "frame persisted");
            }
            Ok(Appended::Skipped) => {}
            Err(e) => {
                self.write_failures += 1;
                self.stats.record_persist_failure();
                warn!("Failed to encode frame {}: {}", frame.sequence(), e);
            }
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Join point for a spawned [`PersistenceWorker`]
pub struct WorkerHandle {
    state: Arc<AtomicU8>,
    thread: JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Block until the worker reaches [`WorkerState::Stopped`]
    pub fn join(self) -> Result<WorkerReport, PipelineError> {
        self.thread.join().map_err(|_| {
            error!("Persistence worker panicked");
            PipelineError::WorkerPanicked
        })
    }
}
