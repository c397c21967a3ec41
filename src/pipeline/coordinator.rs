//! Steady-state capture/display loop and ordered shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::Sender;
use tracing::{debug, error, info, warn};

use crate::capture::{CaptureGate, FrameSource};
use crate::display::{Command, DisplaySink};
use crate::error::PipelineError;
use crate::persist::{
    FrameFeed, Handoff, PersistenceSink, PersistenceWorker, SaveController, Transition,
    WorkerHandle, WorkerReport,
};
use crate::pipeline::{DualBuffer, PipelineStats, RunState, SlotId, StatsSnapshot};
use crate::{CaptureMode, PipelineConfig};

/// Summary of a cleanly finished run
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub stats: StatsSnapshot,
    pub worker: WorkerReport,
    pub elapsed: Duration,
}

/// The pipeline context: owns the exchange and the display, shares the gate,
/// save-state and run-state with the persistence worker.
pub struct Pipeline<S, D, P> {
    settings: PipelineConfig,
    gate: Arc<CaptureGate<S>>,
    save: Arc<SaveController<P>>,
    running: Arc<RunState>,
    stats: Arc<PipelineStats>,
    exchange: DualBuffer,
    display: D,
}

impl<S, D, P> Pipeline<S, D, P>
where
    S: FrameSource + 'static,
    D: DisplaySink,
    P: PersistenceSink + 'static,
{
    pub fn new(settings: PipelineConfig, source: S, display: D, sink: P) -> Self {
        Self {
            settings,
            gate: Arc::new(CaptureGate::new(source)),
            save: Arc::new(SaveController::new(sink)),
            running: Arc::new(RunState::new()),
            stats: Arc::new(PipelineStats::new()),
            exchange: DualBuffer::new(),
            display,
        }
    }

    /// Shared save-state, e.g. for toggling from outside the command poll
    pub fn save_state(&self) -> Arc<SaveController<P>> {
        Arc::clone(&self.save)
    }

    /// Run until the operator quits or the main capture fails.
    ///
    /// Shutdown runs in both cases; a capture failure is returned after it.
    pub fn run(mut self) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        info!(mode = ?self.settings.capture_mode, "Pipeline starting");

        let (handoff, feed) = match self.settings.capture_mode {
            CaptureMode::Independent => (None, FrameFeed::Capture(Arc::clone(&self.gate))),
            CaptureMode::FanOut => {
                let (tx, rx) = flume::bounded(self.settings.handoff_queue_size.max(1));
                (Some(tx), FrameFeed::Handoff(rx))
            }
        };

        let worker = PersistenceWorker::new(
            feed,
            Arc::clone(&self.save),
            Arc::clone(&self.running),
            Arc::clone(&self.stats),
            self.settings.worker_interval(),
        );
        let worker = match worker.spawn() {
            Ok(worker) => worker,
            Err(e) => {
                error!("Encoder thread creation failed: {}", e);
                self.release();
                return Err(e);
            }
        };

        let outcome = self.steady_state(handoff.as_ref());
        let worker_report = self.shutdown(worker, handoff);

        outcome?;
        let worker = worker_report?;
        let report = RunReport {
            stats: self.stats.snapshot(),
            worker,
            elapsed: started.elapsed(),
        };
        info!(
            "Pipeline stopped: {} frames displayed, {} frames persisted in {:.1?}",
            report.stats.frames_displayed, report.stats.frames_persisted, report.elapsed
        );
        Ok(report)
    }

    fn steady_state(&mut self, handoff: Option<&Sender<Handoff>>) -> Result<(), PipelineError> {
        loop {
            let frame = self.gate.capture().map_err(|e| {
                error!("Failed to capture frame: {}", e);
                e
            })?;

            if let Some(tx) = handoff {
                if self.save.is_active() && tx.send(Handoff::Frame(frame.clone())).is_err() {
                    warn!("Persistence worker is gone; frame {} not saved", frame.sequence());
                }
            }

            // One physical frame feeds one display step
            self.exchange.program(SlotId::A, frame.clone());
            self.exchange.program(SlotId::B, frame);

            if let Some(current) = self.exchange.acquire_current() {
                match self.display.render(&current, self.save.is_active()) {
                    Ok(()) => self.stats.record_displayed(),
                    Err(e) => {
                        self.stats.record_render_failure();
                        warn!("Failed to display frame {}: {}", current.sequence(), e);
                    }
                }
            }

            match self.display.poll_command() {
                Command::None => {}
                Command::ToggleSave => self.toggle_save(handoff),
                Command::Quit => {
                    info!("Quit requested");
                    self.stop_saving(handoff);
                    self.running.stop();
                    return Ok(());
                }
            }
        }
    }

    fn toggle_save(&mut self, handoff: Option<&Sender<Handoff>>) {
        if self.save.is_active() {
            self.stop_saving(handoff);
            return;
        }

        match self.save.start() {
            Ok(Transition::Started) => info!("Started saving video"),
            Ok(other) => debug!(?other, "start ignored"),
            Err(e) => error!("Failed to start saving video: {}", e),
        }
    }

    fn stop_saving(&mut self, handoff: Option<&Sender<Handoff>>) {
        if !self.save.is_active() {
            return;
        }
        // Let the worker write everything queued while saving was on
        if let Some(tx) = handoff {
            flush_handoff(tx);
        }
        match self.save.stop() {
            Ok(Transition::Stopped) => info!("Stopped saving video"),
            Ok(other) => debug!(?other, "stop ignored"),
            Err(e) => warn!("Failed to stop saving video: {}", e),
        }
    }

    /// Strict order: signal the worker, join it, finalize persistence, then
    /// release display, exchange and source.
    fn shutdown(
        &mut self,
        worker: WorkerHandle,
        handoff: Option<Sender<Handoff>>,
    ) -> Result<WorkerReport, PipelineError> {
        info!("Entering shutdown");
        self.running.stop();
        drop(handoff);

        let report = worker.join();
        if let Err(e) = self.save.finalize() {
            warn!("Failed to finalize recording: {}", e);
        }
        self.release();
        report
    }

    fn release(&mut self) {
        self.display.close();
        self.exchange.clear();
        self.gate.close();
        debug!("Display, exchange and source released");
    }
}

fn flush_handoff(tx: &Sender<Handoff>) {
    let (ack_tx, ack_rx) = flume::bounded(1);
    if tx.send(Handoff::Flush(ack_tx)).is_ok() && ack_rx.recv().is_err() {
        warn!("Persistence worker exited before draining the hand-off queue");
    }
}
