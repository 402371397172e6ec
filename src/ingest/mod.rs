//! Video sources.
//!
//! A source yields decoded frames in order plus the nominal frame rate used
//! for decimation:
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` sources (tests, dry runs)
//!
//! End of stream is `Ok(None)`, not an error. Sources are released on drop.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

pub use file::FileSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};

/// Ordered, finite sequence of decoded frames.
pub trait FrameSource {
    /// Nominal frames per second; 0 when the container does not say.
    fn frame_rate(&self) -> f64;

    /// Next frame in decode order, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Open a local video file or `stub://` source.
pub fn open(path: &str) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(FileSource::open(path)?))
}
