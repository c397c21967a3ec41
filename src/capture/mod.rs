pub mod frame;
pub mod gate;
pub mod source;
pub mod test_pattern;

#[cfg(feature = "v4l2")]
pub mod decoder;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use frame::{Frame, FrameMetadata, PixelFormat};
pub use gate::CaptureGate;
pub use source::FrameSource;
pub use test_pattern::TestPatternSource;

#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Source;
