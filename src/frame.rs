//! Decoded video frames.
//!
//! `Frame` owns tightly packed RGB24 pixels. A frame lives for one pipeline
//! iteration: it is resized, handed to the detector as a pixel slice, and
//! encoded to JPEG. The original resolution is never written to disk.

use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;

/// Bytes per pixel of the RGB24 layout.
pub const CHANNELS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap RGB24 pixels, checking the buffer matches the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Stretch the frame to exactly `width` x `height`.
    ///
    /// Aspect ratio is not preserved. Bilinear filtering is used.
    pub fn resized(self, width: u32, height: u32) -> Result<Frame> {
        if width == 0 || height == 0 {
            return Err(anyhow!("cannot resize to {}x{}", width, height));
        }
        if width == self.width && height == self.height {
            return Ok(self);
        }
        let image = self.into_image()?;
        let resized = image::imageops::resize(&image, width, height, FilterType::Triangle);
        Ok(Frame {
            width,
            height,
            pixels: resized.into_raw(),
        })
    }

    /// Encode as baseline JPEG at `quality` (1-100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        if !(1..=100).contains(&quality) {
            return Err(anyhow!("JPEG quality must be within 1..=100, got {}", quality));
        }
        let image = RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .context("frame buffer does not match its dimensions")?;
        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode_image(&image)
            .context("JPEG encoding failed")?;
        Ok(buffer.into_inner())
    }

    fn into_image(self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.pixels)
            .context("frame buffer does not match its dimensions")
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}
