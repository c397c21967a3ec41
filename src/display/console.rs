//! Headless display: logs frames and reads operator commands from stdin

use std::io::BufRead;
use std::thread;
use std::time::Instant;

use flume::{Receiver, Sender, TryRecvError};
use tracing::{debug, info, trace, warn};

use crate::capture::Frame;
use crate::display::{status_text, Command, DisplaySink};
use crate::error::{DisplayError, PipelineError};

/// Display sink for terminals and headless hosts
pub struct ConsoleDisplay {
    commands: Receiver<Command>,
    last_status: Option<bool>,
    rendered: u64,
    started: Instant,
}

impl ConsoleDisplay {
    /// Read commands from stdin on a background thread.
    ///
    /// `s` toggles saving and `q` quits; end of input is treated as quit.
    pub fn stdin() -> Result<Self, PipelineError> {
        let (tx, rx) = flume::unbounded();
        thread::Builder::new()
            .name("stdin-commands".into())
            .spawn(move || read_commands(std::io::stdin().lock(), tx))
            .map_err(|e| PipelineError::acquisition("display", e))?;

        info!("Press 's' + Enter to toggle saving, 'q' + Enter to quit");
        Ok(Self::with_commands(rx))
    }

    /// Use an existing command channel
    pub fn with_commands(commands: Receiver<Command>) -> Self {
        Self {
            commands,
            last_status: None,
            rendered: 0,
            started: Instant::now(),
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.rendered
    }
}

fn read_commands(input: impl BufRead, tx: Sender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read operator input: {}", e);
                break;
            }
        };
        for key in line.trim().chars() {
            let command = Command::from_key(key);
            if command != Command::None && tx.send(command).is_err() {
                return;
            }
        }
    }
    debug!("Operator input closed");
    let _ = tx.send(Command::Quit);
}

impl DisplaySink for ConsoleDisplay {
    fn render(&mut self, frame: &Frame, saving: bool) -> Result<(), DisplayError> {
        let render_start = Instant::now();
        if frame.data.is_empty() {
            return Err(DisplayError::Render(format!(
                "frame {} has no pixel data",
                frame.sequence()
            )));
        }

        // Overlay only changes on toggles; print it once per transition
        if self.last_status != Some(saving) {
            info!("[{}]", status_text(saving));
            self.last_status = Some(saving);
        }

        self.rendered += 1;
        let (width, height) = frame.dimensions();
        trace!(sequence = frame.sequence(), width, height, "frame rendered");
        metrics::histogram!("frame_latency_ms")
            .record(frame.timestamp.elapsed().as_secs_f64() * 1000.0);
        metrics::histogram!("render_time_us").record(render_start.elapsed().as_micros() as f64);
        Ok(())
    }

    fn poll_command(&mut self) -> Command {
        match self.commands.try_recv() {
            Ok(command) => command,
            Err(TryRecvError::Empty) => Command::None,
            // Nobody can send another command, so nobody can ever quit
            Err(TryRecvError::Disconnected) => Command::Quit,
        }
    }

    fn close(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.rendered as f64 / elapsed
        } else {
            0.0
        };
        info!(
            "Console display closed: {} frames rendered ({:.1} fps)",
            self.rendered, fps
        );
    }
}
