//! dualcam: capture, preview and optionally record a camera stream

use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dualcam::capture::{FrameSource, TestPatternSource};
use dualcam::display::{ConsoleDisplay, DisplaySink};
use dualcam::persist::RawFileSink;
use dualcam::{
    CaptureConfig, Collaborators, Config, DisplayBackend, DisplayConfig, Pipeline, PipelineError,
    SourceKind,
};

const CONFIG_FILE: &str = "dualcam.toml";

fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dualcam=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("dualcam launching...");

    // Load configuration; the only argument is an optional output path
    let mut config = Config::load(Some(Path::new(CONFIG_FILE)))?;
    if let Some(output) = std::env::args_os().nth(1) {
        config.persistence.output_path = PathBuf::from(output);
    }

    // Acquire in order: camera, display, recorder. Unwind in reverse on failure.
    let Collaborators {
        source,
        display,
        recorder,
    } = dualcam::acquire(
        || open_source(&config.capture),
        || open_display(&config.display),
        || RawFileSink::new(&config.persistence.output_path),
    )?;

    let pipeline = Pipeline::new(config.pipeline, source, display, recorder);
    let report = pipeline
        .run()
        .map_err(|e| eyre!("pipeline aborted: {}", e))?;

    info!(
        "Shut down cleanly: {} frames displayed, {} frames saved",
        report.stats.frames_displayed, report.stats.frames_persisted
    );
    Ok(())
}

fn open_source(config: &CaptureConfig) -> Result<Box<dyn FrameSource>, PipelineError> {
    match config.source {
        SourceKind::TestPattern => Ok(Box::new(TestPatternSource::new(
            config.width,
            config.height,
            config.fps,
        ))),
        #[cfg(feature = "v4l2")]
        SourceKind::V4l2 => {
            let mut config = config.clone();
            if config.device.is_empty() {
                let found = dualcam::utils::auto_detect_device()?;
                config.device = found.path;
                config.format = found.format;
            }
            Ok(Box::new(dualcam::capture::V4l2Source::open(config)?))
        }
        #[cfg(not(feature = "v4l2"))]
        SourceKind::V4l2 => Err(PipelineError::acquisition(
            "camera",
            "built without the `v4l2` feature",
        )),
    }
}

fn open_display(config: &DisplayConfig) -> Result<Box<dyn DisplaySink>, PipelineError> {
    match config.backend {
        DisplayBackend::Console => Ok(Box::new(ConsoleDisplay::stdin()?)),
        #[cfg(feature = "sdl2-display")]
        DisplayBackend::Sdl2 => Ok(Box::new(dualcam::display::Sdl2Display::new(
            config.width,
            config.height,
        )?)),
        #[cfg(not(feature = "sdl2-display"))]
        DisplayBackend::Sdl2 => Err(PipelineError::acquisition(
            "display",
            "built without the `sdl2-display` feature",
        )),
    }
}
