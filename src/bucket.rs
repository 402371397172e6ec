//! Confidence buckets.
//!
//! A frame is filed under the 0.1-wide interval containing its strongest
//! detection, e.g. a maximum confidence of 0.65 lands in `0.6-0.7`. Frames
//! without detections land in `no_detections`.
//!
//! Bounds are kept as integer tenths so labels never carry binary
//! floating-point noise (`0.1 + 0.2` style drift).

use std::fmt;

/// Directory name for frames with an empty detection set.
pub const NO_DETECTIONS: &str = "no_detections";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfidenceBucket {
    NoDetections,
    /// `[tenths / 10, tenths / 10 + 0.1)`.
    Range { tenths: i64 },
}

impl ConfidenceBucket {
    /// Bucket for a confidence value.
    ///
    /// The lower bound is `trunc(c * 10) / 10`. Inputs outside `[0, 1]` are
    /// not clamped, so `1.0` yields `1.0-1.1`.
    pub fn for_confidence(confidence: f64) -> Self {
        ConfidenceBucket::Range {
            tenths: lower_tenths(confidence),
        }
    }

    /// Bucket for a detector score.
    ///
    /// Unlike plain truncation of the widened value, scores go through their
    /// shortest decimal form first, so `0.7f32` (0.699999988... as f64) lands
    /// in `0.7-0.8`, not `0.6-0.7`. Only scores sitting exactly on a tenth
    /// boundary are affected.
    pub fn for_score(score: f32) -> Self {
        // f32 Display prints the shortest string that round-trips, which is
        // the decimal the detector meant; `f64::from` would keep the binary
        // error of the f32 instead.
        let widened = score.to_string().parse::<f64>().unwrap_or(f64::from(score));
        Self::for_confidence(widened)
    }

    /// Bucket for the maximum score of a frame, `None` meaning no detections.
    pub fn for_max_score(max_score: Option<f32>) -> Self {
        match max_score {
            Some(score) => Self::for_score(score),
            None => ConfidenceBucket::NoDetections,
        }
    }

    /// Lower bound of the interval, `None` for `no_detections`.
    pub fn lower_bound(&self) -> Option<f64> {
        match self {
            ConfidenceBucket::NoDetections => None,
            ConfidenceBucket::Range { tenths } => Some(*tenths as f64 / 10.0),
        }
    }
}

impl fmt::Display for ConfidenceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceBucket::NoDetections => f.write_str(NO_DETECTIONS),
            ConfidenceBucket::Range { tenths } => {
                write_tenths(f, *tenths)?;
                f.write_str("-")?;
                write_tenths(f, tenths.saturating_add(1))
            }
        }
    }
}

/// Label of the bucket containing `confidence`, e.g. `0.65 -> "0.6-0.7"`.
pub fn bucket_label(confidence: f64) -> String {
    ConfidenceBucket::for_confidence(confidence).to_string()
}

// Truncates toward zero; NaN maps to 0 through the saturating cast.
fn lower_tenths(confidence: f64) -> i64 {
    (confidence * 10.0).trunc() as i64
}

fn write_tenths(f: &mut fmt::Formatter<'_>, tenths: i64) -> fmt::Result {
    let sign = if tenths < 0 { "-" } else { "" };
    let magnitude = tenths.unsigned_abs();
    write!(f, "{}{}.{}", sign, magnitude / 10, magnitude % 10)
}
