//! Serialized access to a shared frame source

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{instrument, trace};

use crate::capture::{Frame, FrameSource};
use crate::error::PipelineError;

/// Mutual-exclusion wrapper around a [`FrameSource`].
///
/// The lock is held only for the duration of one source call, so at most one
/// capture is in flight pipeline-wide. Callers alternate in whatever order
/// the lock is granted.
pub struct CaptureGate<S> {
    source: Mutex<S>,
}

impl<S: FrameSource> CaptureGate<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Mutex::new(source),
        }
    }

    /// Capture one frame. Failures are returned as-is; the gate never retries.
    #[instrument(skip(self), level = "trace")]
    pub fn capture(&self) -> Result<Frame, PipelineError> {
        let frame = self.lock().capture()?;
        trace!(sequence = frame.sequence(), "frame captured");
        metrics::counter!("frames_captured").increment(1);
        Ok(frame)
    }

    /// Release the underlying source under the same lock.
    pub fn close(&self) {
        self.lock().close();
    }

    // A panic inside a source call leaves the source itself usable.
    fn lock(&self) -> MutexGuard<'_, S> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// Source that fails loudly if two calls ever overlap
    struct OverlapDetector {
        in_flight: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    impl FrameSource for OverlapDetector {
        fn capture(&mut self) -> Result<Frame, SourceError> {
            assert!(
                !self.in_flight.swap(true, Ordering::SeqCst),
                "source observed two overlapping captures"
            );
            thread::sleep(Duration::from_micros(200));
            let seq = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            self.in_flight.store(false, Ordering::SeqCst);
            Ok(Frame::rgb24(seq, 1, 1, vec![0u8; 3]))
        }
    }

    #[test]
    fn concurrent_captures_never_overlap() {
        let calls = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(CaptureGate::new(OverlapDetector {
            in_flight: Arc::clone(&in_flight),
            calls: Arc::clone(&calls),
        }));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    for _ in 0..50 {
                        gate.capture().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("capture thread panicked");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 100);
        assert!(!in_flight.load(Ordering::SeqCst));
    }

    struct Failing;

    impl FrameSource for Failing {
        fn capture(&mut self) -> Result<Frame, SourceError> {
            Err(SourceError::Timeout(Duration::from_millis(5)))
        }
    }

    #[test]
    fn failures_propagate_as_capture_failed() {
        let gate = CaptureGate::new(Failing);
        let err = gate.capture().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CaptureFailed(SourceError::Timeout(_))
        ));
    }
}
