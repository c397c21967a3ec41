//! V4L2 camera source with memory-mapped buffers

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::capture::decoder;
use crate::capture::frame::{Frame, FrameMetadata, PixelFormat};
use crate::capture::FrameSource;
use crate::error::{PipelineError, SourceError};
use crate::CaptureConfig;

/// V4L2 capture producing RGB24 frames
pub struct V4l2Source {
    stream: Option<MmapStream<'static>>,
    _device: Box<Device>,
    config: CaptureConfig,
    timeout: Duration,
    sequence: u64,
}

impl V4l2Source {
    /// Open the device, negotiate the format and start streaming
    pub fn open(config: CaptureConfig) -> Result<Self, PipelineError> {
        info!("Initializing V4L2 capture: {}", config.device);
        let acquire = |e: std::io::Error| PipelineError::acquisition("camera", e);

        let device = Device::with_path(&config.device).map_err(acquire)?;

        // Query capabilities
        let caps = device.query_caps().map_err(acquire)?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(PipelineError::acquisition(
                "camera",
                "device doesn't support video capture",
            ));
        }

        let mut fmt = device.format().map_err(acquire)?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = match config.format {
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
            PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
            PixelFormat::Yuyv4 => {
                return Err(PipelineError::acquisition(
                    "camera",
                    "unsupported pixel format: Yuyv4",
                ))
            }
        };
        let fmt = device.set_format(&fmt).map_err(acquire)?;
        if fmt.width != config.width || fmt.height != config.height {
            warn!(
                "Device adjusted resolution to {}x{} (requested {}x{})",
                fmt.width, fmt.height, config.width, config.height
            );
        }

        let device = Box::new(device);
        let mut stream =
            MmapStream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
                .map_err(acquire)?;
        let timeout = Duration::from_millis(config.timeout_ms);
        stream.set_timeout(timeout);
        info!("Capture stream started with {} buffers", config.buffer_count);

        let mut config = config;
        config.width = fmt.width;
        config.height = fmt.height;

        Ok(Self {
            stream: Some(stream),
            _device: device,
            config,
            timeout,
            sequence: 0,
        })
    }
}

impl FrameSource for V4l2Source {
    #[instrument(skip(self), level = "trace")]
    fn capture(&mut self) -> Result<Frame, SourceError> {
        let timestamp = Instant::now();

        let stream = self.stream.as_mut().ok_or(SourceError::Closed)?;

        let (buf, meta) = stream.next().map_err(|e| match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => SourceError::Timeout(self.timeout),
            _ => SourceError::Device(e.to_string()),
        })?;

        // The mmap'd buffer is requeued on the next dequeue, so copy out now
        let used = (meta.bytesused as usize).min(buf.len());
        let data = decoder::decode_frame(&buf[..used], self.config.format)?;

        self.sequence += 1;

        let frame_meta = Arc::new(FrameMetadata {
            sequence: self.sequence,
            width: self.config.width,
            height: self.config.height,
            stride: self.config.width * PixelFormat::Rgb24.bytes_per_pixel(),
            format: PixelFormat::Rgb24,
            device_timestamp: Some(
                Duration::from_secs(meta.timestamp.sec as u64)
                    + Duration::from_micros(meta.timestamp.usec as u64),
            ),
        });

        Ok(Frame {
            data,
            meta: frame_meta,
            timestamp,
        })
    }

    fn close(&mut self) {
        // Dropping the stream stops streaming and unmaps the buffers
        if self.stream.take().is_some() {
            info!(
                "V4L2 capture on {} stopped after {} frames",
                self.config.device, self.sequence
            );
        }
    }
}
