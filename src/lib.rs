pub mod capture;
pub mod display;
pub mod error;
pub mod persist;
pub mod pipeline;
#[cfg(feature = "v4l2")]
pub mod utils;

use std::path::{Path, PathBuf};
use std::time::Duration;

use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

pub use capture::{CaptureGate, Frame, FrameSource};
pub use display::{Command, DisplaySink};
pub use error::{PipelineError, Result};
pub use persist::{PersistenceSink, SaveController};
pub use pipeline::{acquire, Collaborators, Pipeline, RunReport};

/// Prefix for environment overrides, e.g. `DUALCAM__CAPTURE__FPS=15`
pub const ENV_PREFIX: &str = "DUALCAM";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub display: DisplayConfig,
    pub pipeline: PipelineConfig,
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    TestPattern,
    V4l2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: SourceKind,
    /// Device path; empty means auto-detect
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
    /// Per-capture timeout for hardware sources
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayBackend {
    Console,
    Sdl2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub backend: DisplayBackend,
    pub width: u32,
    pub height: u32,
}

/// How the persistence worker obtains frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// The worker captures its own frames through the shared gate
    Independent,
    /// The coordinator captures once and hands frames to the worker
    FanOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub capture_mode: CaptureMode,
    /// Pause between persistence worker iterations
    pub worker_interval_ms: u64,
    /// Bound of the fan-out hand-off queue
    pub handoff_queue_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub output_path: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::TestPattern,
            device: "/dev/video0".into(),
            width: 1280,
            height: 720,
            fps: 30,
            format: PixelFormat::Rgb24,
            buffer_count: 3,
            timeout_ms: 2000,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: DisplayBackend::Console,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capture_mode: CaptureMode::Independent,
            worker_interval_ms: 10,
            handoff_queue_size: 8,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("output/output_video.rgb"),
        }
    }
}

impl PipelineConfig {
    /// Worker pause, never below 1 ms so the worker cannot spin
    pub fn worker_interval(&self) -> Duration {
        Duration::from_millis(self.worker_interval_ms.max(1))
    }
}

impl Config {
    /// Layer an optional TOML file and `DUALCAM__*` environment variables
    /// over the defaults. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn defaults_without_file() {
        let config = Config::load(Some(Path::new("/nonexistent/dualcam.toml"))).unwrap();
        assert_eq!(config.capture.source, SourceKind::TestPattern);
        assert_eq!(config.capture.width, 1280);
        assert_eq!(config.pipeline.capture_mode, CaptureMode::Independent);
        assert_eq!(config.pipeline.worker_interval_ms, 10);
        assert_eq!(
            config.persistence.output_path,
            PathBuf::from("output/output_video.rgb")
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dualcam.toml");
        fs::write(
            &path,
            r#"
[capture]
width = 320
height = 240
fps = 0

[pipeline]
capture_mode = "fan_out"

[persistence]
output_path = "/tmp/recording.rgb"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.capture.width, 320);
        assert_eq!(config.capture.height, 240);
        assert_eq!(config.capture.fps, 0);
        // Untouched keys keep their defaults
        assert_eq!(config.capture.buffer_count, 3);
        assert_eq!(config.pipeline.capture_mode, CaptureMode::FanOut);
        assert_eq!(config.pipeline.handoff_queue_size, 8);
        assert_eq!(
            config.persistence.output_path,
            PathBuf::from("/tmp/recording.rgb")
        );
    }

    #[test]
    fn zero_worker_interval_is_clamped() {
        let mut pipeline = PipelineConfig {
            worker_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(pipeline.worker_interval(), Duration::from_millis(1));

        pipeline.worker_interval_ms = 25;
        assert_eq!(pipeline.worker_interval(), Duration::from_millis(25));
    }

    #[test]
    fn environment_overrides_apply() {
        std::env::set_var("DUALCAM__DISPLAY__WIDTH", "640");
        let config = Config::load(None).unwrap();
        std::env::remove_var("DUALCAM__DISPLAY__WIDTH");

        assert_eq!(config.display.width, 640);
        assert_eq!(config.display.backend, DisplayBackend::Console);
    }
}
