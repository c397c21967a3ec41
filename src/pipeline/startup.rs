//! Ordered acquisition of the pipeline's collaborators

use tracing::{error, info};

use crate::capture::FrameSource;
use crate::display::DisplaySink;
use crate::error::PipelineError;
use crate::persist::PersistenceSink;

/// Everything a [`Pipeline`](crate::Pipeline) needs, opened and ready
pub struct Collaborators<S, D, P> {
    pub source: S,
    pub display: D,
    pub recorder: P,
}

/// Open source, display and recorder in that order.
///
/// When a step fails, whatever was already opened is closed in reverse order
/// before the error is returned.
pub fn acquire<S, D, P>(
    open_source: impl FnOnce() -> Result<S, PipelineError>,
    open_display: impl FnOnce() -> Result<D, PipelineError>,
    open_recorder: impl FnOnce() -> Result<P, PipelineError>,
) -> Result<Collaborators<S, D, P>, PipelineError>
where
    S: FrameSource,
    D: DisplaySink,
    P: PersistenceSink,
{
    let mut source = open_source().map_err(|e| {
        error!("Camera init failed: {}", e);
        e
    })?;
    info!("Camera initialized.");

    let mut display = match open_display() {
        Ok(display) => display,
        Err(e) => {
            error!("Display init failed: {}", e);
            source.close();
            return Err(e);
        }
    };
    info!("Display initialized.");

    let recorder = match open_recorder() {
        Ok(recorder) => recorder,
        Err(e) => {
            error!("Encoder init failed: {}", e);
            display.close();
            source.close();
            return Err(e);
        }
    };
    info!("Encoder initialized.");

    Ok(Collaborators {
        source,
        display,
        recorder,
    })
}
