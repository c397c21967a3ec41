use bytes::Bytes;
use jpeg_decoder::Decoder;

use super::frame::PixelFormat;
use crate::error::SourceError;

/// Turn a raw device buffer into RGB24 pixels
pub fn decode_frame(data: &[u8], format: PixelFormat) -> Result<Bytes, SourceError> {
    match format {
        PixelFormat::Mjpeg => {
            let mut decoder = Decoder::new(data);
            let pixels = decoder
                .decode()
                .map_err(|e| SourceError::Device(format!("MJPEG decode failed: {}", e)))?;
            Ok(Bytes::from(pixels))
        }
        // Already in RGB format
        PixelFormat::Rgb24 => Ok(Bytes::copy_from_slice(data)),
        PixelFormat::Yuyv4 => Err(SourceError::Device(
            "YUYV frames must be converted by the device".into(),
        )),
    }
}
