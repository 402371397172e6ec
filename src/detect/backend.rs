use anyhow::Result;

use crate::detect::result::DetectionSet;

/// Object detector seam.
///
/// The pipeline owns one backend for the duration of a run and calls
/// `detect` once per sampled frame, after the frame has been resized to the
/// output dimensions.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a tightly packed RGB24 frame.
    ///
    /// An empty set means nothing was detected. Confidences are expected in
    /// `[0, 1]` but are not validated here.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionSet>;

    /// Optional warm-up hook, run once after loading.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
