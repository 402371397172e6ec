//! Local video source.
//!
//! `FileSource` opens either a local video file (decoded with FFmpeg when the
//! `ingest-file-ffmpeg` feature is enabled) or a synthetic `stub://` source.
//! Remote URLs are refused.

use std::path::Path;

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::{SyntheticConfig, SyntheticSource};
use super::FrameSource;
use crate::frame::Frame;

/// Local video source. Dropping it releases the decoder.
pub struct FileSource {
    path: String,
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(path: &str) -> Result<Self> {
        if !is_local_file_path(path) {
            return Err(anyhow!(
                "only local video files and stub:// sources are supported, got '{}'",
                path
            ));
        }
        let backend = if path.starts_with("stub://") {
            FileBackend::Synthetic(SyntheticSource::new(SyntheticConfig::parse(path)?))
        } else {
            if !Path::new(path).is_file() {
                return Err(anyhow!("video file '{}' does not exist", path));
            }
            open_decoder(path)?
        };
        Ok(Self {
            path: path.to_string(),
            backend,
        })
    }
}

#[cfg(feature = "ingest-file-ffmpeg")]
fn open_decoder(path: &str) -> Result<FileBackend> {
    Ok(FileBackend::Ffmpeg(FfmpegFileSource::open(path)?))
}

#[cfg(not(feature = "ingest-file-ffmpeg"))]
fn open_decoder(_path: &str) -> Result<FileBackend> {
    Err(anyhow!(
        "decoding video files requires the ingest-file-ffmpeg feature"
    ))
}

impl FrameSource for FileSource {
    fn frame_rate(&self) -> f64 {
        match &self.backend {
            FileBackend::Synthetic(source) => source.frame_rate(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frame_rate(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        log::debug!("released video source {}", self.path);
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
