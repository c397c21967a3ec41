use std::path::Path;

use tracing::info;
use v4l::{capability::Flags, video::Capture, Device, FourCC};

use crate::capture::frame::PixelFormat;
use crate::error::PipelineError;

/// Detected capture device info
#[derive(Debug, Clone)]
pub struct FoundDevice {
    pub path: String,
    pub format: PixelFormat,
}

/// Auto-detect the first capture device delivering a format the V4L2 source
/// can hand on as RGB24
pub fn auto_detect_device() -> Result<FoundDevice, PipelineError> {
    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            continue;
        }

        let Ok(formats) = dev.enum_formats() else {
            continue;
        };
        for fmt in formats {
            if fmt.fourcc == FourCC::new(b"RGB3") {
                info!("Found RGB24 device: {} - {}", path, caps.card);
                return Ok(FoundDevice {
                    path,
                    format: PixelFormat::Rgb24,
                });
            } else if fmt.fourcc == FourCC::new(b"MJPG") {
                info!("Found MJPEG device: {} - {}", path, caps.card);
                return Ok(FoundDevice {
                    path,
                    format: PixelFormat::Mjpeg,
                });
            }
        }
    }

    Err(PipelineError::acquisition(
        "camera",
        "no suitable capture device found",
    ))
}
