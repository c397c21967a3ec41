//! Error taxonomy for the pipeline and its collaborators

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures reported by a [`FrameSource`](crate::capture::FrameSource)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("capture timed out after {0:?}")]
    Timeout(Duration),

    #[error("device error: {0}")]
    Device(String),

    #[error("source is closed")]
    Closed,
}

/// Failures reported by a [`DisplaySink`](crate::display::DisplaySink)
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("render failed: {0}")]
    Render(String),
}

/// Failures reported by a [`PersistenceSink`](crate::persist::PersistenceSink)
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("close failed: {0}")]
    Close(#[source] std::io::Error),

    #[error("persistence resource is not open")]
    NotOpen,
}

/// Top-level pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An external resource failed to open during startup
    #[error("failed to acquire {resource}: {reason}")]
    AcquisitionFailed {
        resource: &'static str,
        reason: String,
    },

    #[error("capture failed: {0}")]
    CaptureFailed(#[from] SourceError),

    #[error("failed to start saving: {0}")]
    PersistenceOpenFailed(#[source] PersistenceError),

    #[error("failed to persist frame: {0}")]
    PersistenceWriteFailed(#[source] PersistenceError),

    #[error("persistence worker panicked")]
    WorkerPanicked,

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl PipelineError {
    pub fn acquisition(resource: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::AcquisitionFailed {
            resource,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
