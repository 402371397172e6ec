//! Synthetic frame source (`stub://`) for tests and dry runs.
//!
//! URI form: `stub://<frames>@<fps>[/<width>x<height>]`, e.g. `stub://100@10`
//! for ten seconds of 10 fps video at the default 64x48 resolution.

use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use regex::Regex;

use super::FrameSource;
use crate::frame::{rgb_len, Frame};

const DEFAULT_WIDTH: u32 = 64;
const DEFAULT_HEIGHT: u32 = 48;
/// Largest synthetic frame, 8K UHD.
const MAX_PIXELS: usize = 7680 * 4320;

#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticConfig {
    /// Total frames before end-of-stream.
    pub frames: u64,
    /// Reported nominal frame rate.
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl SyntheticConfig {
    /// Parse a `stub://` URI.
    pub fn parse(uri: &str) -> Result<Self> {
        static STUB_URI_RE: OnceLock<Regex> = OnceLock::new();
        let re = STUB_URI_RE.get_or_init(|| {
            Regex::new(r"^stub://(\d+)@(\d+(?:\.\d+)?)(?:/(\d+)x(\d+))?$")
                .expect("synthetic uri pattern is valid")
        });

        let caps = re.captures(uri.trim()).ok_or_else(|| {
            anyhow!(
                "invalid synthetic source '{}' (expected stub://<frames>@<fps>[/<w>x<h>])",
                uri
            )
        })?;
        let frames = caps[1]
            .parse()
            .map_err(|_| anyhow!("frame count out of range in '{}'", uri))?;
        let fps = caps[2]
            .parse()
            .map_err(|_| anyhow!("invalid frame rate in '{}'", uri))?;
        let (width, height) = match (caps.get(3), caps.get(4)) {
            (Some(w), Some(h)) => (
                w.as_str()
                    .parse()
                    .map_err(|_| anyhow!("invalid width in '{}'", uri))?,
                h.as_str()
                    .parse()
                    .map_err(|_| anyhow!("invalid height in '{}'", uri))?,
            ),
            _ => (DEFAULT_WIDTH, DEFAULT_HEIGHT),
        };
        let cfg = Self {
            frames,
            fps,
            width,
            height,
        };
        cfg.frame_len()?;
        Ok(cfg)
    }

    /// RGB bytes per frame, rejecting empty and oversized dimensions.
    pub fn frame_len(&self) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!("synthetic frames must have non-zero dimensions"));
        }
        (self.width as usize)
            .checked_mul(self.height as usize)
            .filter(|&pixels| pixels <= MAX_PIXELS)
            .ok_or_else(|| {
                anyhow!(
                    "synthetic frame {}x{} exceeds {} pixels",
                    self.width,
                    self.height,
                    MAX_PIXELS
                )
            })?;
        rgb_len(self.width, self.height)
    }
}

/// Generates a moving gradient, one frame per call, until `frames` is reached.
pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        log::info!(
            "synthetic source: {} frames at {} fps ({}x{})",
            config.frames,
            config.fps,
            config.width,
            config.height
        );
        Self {
            config,
            frame_count: 0,
        }
    }

    fn generate_pixels(&self) -> Result<Vec<u8>> {
        let mut pixels = vec![0u8; self.config.frame_len()?];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        Ok(pixels)
    }
}

impl FrameSource for SyntheticSource {
    fn frame_rate(&self) -> f64 {
        self.config.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.config.frames {
            return Ok(None);
        }
        let pixels = self.generate_pixels()?;
        self.frame_count += 1;
        Frame::new(self.config.width, self.config.height, pixels).map(Some)
    }
}
