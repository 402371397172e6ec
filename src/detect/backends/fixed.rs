use anyhow::{bail, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::DetectionSet;

/// Scripted backend for tests and dry runs.
///
/// Each call reports full-frame detections with the next confidence list of
/// the script, cycling when the script runs out. An empty list means the
/// frame has no detections.
pub struct FixedBackend {
    script: Vec<Vec<f32>>,
    fail_on: Vec<u64>,
    calls: u64,
}

impl FixedBackend {
    /// Report the same confidences on every call.
    pub fn new(confidences: Vec<f32>) -> Self {
        Self::scripted(vec![confidences])
    }

    /// Report `script[n % len]` on the n-th call.
    pub fn scripted(script: Vec<Vec<f32>>) -> Self {
        Self {
            script,
            fail_on: Vec::new(),
            calls: 0,
        }
    }

    /// Fail the given zero-based call instead of reporting detections.
    pub fn failing_on(mut self, call: u64) -> Self {
        self.fail_on.push(call);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for FixedBackend {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionSet> {
        let call = self.calls;
        self.calls += 1;

        if self.fail_on.contains(&call) {
            bail!("scripted failure on call {}", call);
        }
        if self.script.is_empty() {
            return Ok(DetectionSet::default());
        }
        let index = (call % self.script.len() as u64) as usize;
        Ok(DetectionSet::from_confidences(&self.script[index]))
    }
}
