//! Synthetic RGB24 source for running the pipeline without a camera

use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use tracing::info;

use crate::capture::{Frame, FrameSource};
use crate::error::SourceError;

/// Generates a moving gradient, paced to a target frame rate
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_interval: Option<Duration>,
    next_deadline: Instant,
    sequence: u64,
    closed: bool,
}

impl TestPatternSource {
    /// `fps == 0` disables pacing
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        info!("Initializing test pattern source: {}x{} @ {} fps", width, height, fps);
        let frame_interval = (fps > 0).then(|| Duration::from_secs(1) / fps);

        Self {
            width,
            height,
            frame_interval,
            next_deadline: Instant::now(),
            sequence: 0,
            closed: false,
        }
    }

    fn pace(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        let now = Instant::now();
        if self.next_deadline > now {
            std::thread::sleep(self.next_deadline - now);
            self.next_deadline += interval;
        } else {
            // Fell behind; don't try to catch up with a burst
            self.next_deadline = now + interval;
        }
    }

    fn render(&self) -> BytesMut {
        let shift = (self.sequence % 256) as u32;
        let mut buf = BytesMut::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                buf.put_u8(((x + shift) % 256) as u8);
                buf.put_u8(((y + shift) % 256) as u8);
                buf.put_u8(shift as u8);
            }
        }
        buf
    }
}

impl FrameSource for TestPatternSource {
    fn capture(&mut self) -> Result<Frame, SourceError> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        self.pace();
        self.sequence += 1;
        Ok(Frame::rgb24(
            self.sequence,
            self.width,
            self.height,
            self.render().freeze(),
        ))
    }

    fn close(&mut self) {
        if !self.closed {
            info!("Test pattern source closed after {} frames", self.sequence);
            self.closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_sequenced_rgb_frames() {
        let mut source = TestPatternSource::new(4, 2, 0);
        let first = source.capture().unwrap();
        let second = source.capture().unwrap();

        assert_eq!(first.sequence(), 1);
        assert_eq!(second.sequence(), 2);
        assert_eq!(first.dimensions(), (4, 2));
        assert_eq!(first.data.len(), 4 * 2 * 3);
        assert_ne!(first.data, second.data);
    }

    #[test]
    fn capture_after_close_fails() {
        let mut source = TestPatternSource::new(2, 2, 0);
        source.close();
        assert!(matches!(source.capture(), Err(SourceError::Closed)));
    }
}
