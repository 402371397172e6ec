//! Frame sampling and bucketing.
//!
//! One synchronous pass over a video: decimate to the target rate, resize,
//! detect, pick the confidence bucket from the strongest detection, and write
//! the frame as `<output>/<bucket>/frame_NNNNN.jpg`. Saved indices are shared
//! across buckets and start at zero on every run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::bucket::ConfidenceBucket;
use crate::detect::{self, DetectorBackend, DetectorSettings};
use crate::error::{ErrorKind, SortError, SortResult};
use crate::frame::Frame;
use crate::ingest::{self, FrameSource};

pub const DEFAULT_OUTPUT_DIR: &str = "outputFolder";
pub const DEFAULT_TARGET_FPS: f64 = 3.0;
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 380;
pub const DEFAULT_JPEG_QUALITY: u8 = 99;

/// What to do when a single sampled frame cannot be processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run and return the error. Files already written stay.
    #[default]
    Abort,
    /// Log the failure, count it, and continue with the next frame.
    Skip,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(anyhow!(
                "unknown frame error policy '{}' (expected abort|skip)",
                other
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    pub output_dir: PathBuf,
    /// Frames sampled per second of source video.
    pub target_fps: f64,
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            target_fps: DEFAULT_TARGET_FPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> SortResult<()> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(SortError::new(
                ErrorKind::Config,
                format!("target fps must be a positive number, got {}", self.target_fps),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SortError::new(
                ErrorKind::Config,
                format!(
                    "output dimensions must be non-zero, got {}x{}",
                    self.width, self.height
                ),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(SortError::new(
                ErrorKind::Config,
                format!(
                    "JPEG quality must be within 1..=100, got {}",
                    self.jpeg_quality
                ),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(SortError::new(
                ErrorKind::Config,
                "output directory must be set",
            ));
        }
        Ok(())
    }
}

/// One frame written to disk.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SavedFrame {
    pub saved_index: u64,
    /// Zero-based position of the frame in the source.
    pub source_index: u64,
    pub max_confidence: Option<f32>,
    pub bucket: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub source_frame_rate: f64,
    pub sampling_interval: u64,
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub frames_saved: u64,
    pub frames_failed: u64,
    pub bucket_counts: BTreeMap<String, u64>,
    pub cancelled: bool,
}

impl RunSummary {
    fn record(&mut self, saved: &SavedFrame) {
        self.frames_saved += 1;
        *self.bucket_counts.entry(saved.bucket.clone()).or_insert(0) += 1;
    }
}

/// Source frames between samples.
///
/// `floor(source_fps / target_fps)`, or 1 when the source rate is unknown.
/// A source slower than the target yields 1 (every frame is sampled).
pub fn sampling_interval(source_fps: f64, target_fps: f64) -> u64 {
    if !(source_fps.is_finite() && source_fps > 0.0) {
        return 1;
    }
    let interval = (source_fps / target_fps).floor();
    if interval.is_finite() && interval >= 1.0 {
        interval as u64
    } else {
        1
    }
}

/// File name of the n-th saved frame.
pub fn frame_file_name(saved_index: u64) -> String {
    format!("frame_{:05}.jpg", saved_index)
}

/// Loop-local counters.
struct SamplingState {
    interval: u64,
    frames_read: u64,
    saved_index: u64,
}

impl SamplingState {
    fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            frames_read: 0,
            saved_index: 0,
        }
    }

    /// Consume one source position, returning it and whether it is sampled.
    fn advance(&mut self) -> (u64, bool) {
        let position = self.frames_read;
        self.frames_read += 1;
        (position, position % self.interval == 0)
    }
}

/// Load the detector, open the video and sort it.
///
/// The detector is loaded before the video is opened. An unopenable video
/// returns `SourceUnavailable` without writing anything.
pub fn sort_video(
    video: &str,
    detector: &DetectorSettings,
    settings: &PipelineSettings,
    cancel: &AtomicBool,
    observer: impl FnMut(&SavedFrame),
) -> SortResult<RunSummary> {
    settings.validate()?;

    let mut backend =
        detect::load(detector).map_err(|e| SortError::from_anyhow(ErrorKind::DetectorLoad, e))?;
    let mut source = ingest::open(video).map_err(|e| {
        log::error!("cannot open video {}: {:#}", video, e);
        SortError::from_anyhow(ErrorKind::SourceUnavailable, e)
    })?;

    let summary = run_pipeline(settings, backend.as_mut(), source.as_mut(), cancel, observer);
    drop(source);
    summary
}

/// Sort every sampled frame of an already-open source.
pub fn run_pipeline(
    settings: &PipelineSettings,
    detector: &mut dyn DetectorBackend,
    source: &mut dyn FrameSource,
    cancel: &AtomicBool,
    mut observer: impl FnMut(&SavedFrame),
) -> SortResult<RunSummary> {
    settings.validate()?;

    let source_fps = source.frame_rate();
    let interval = sampling_interval(source_fps, settings.target_fps);
    log::info!(
        "sampling every {} frame(s) (source {:.3} fps, target {} fps) into {}",
        interval,
        source_fps,
        settings.target_fps,
        settings.output_dir.display()
    );

    let mut state = SamplingState::new(interval);
    let mut summary = RunSummary {
        source_frame_rate: source_fps,
        sampling_interval: interval,
        ..RunSummary::default()
    };

    loop {
        if cancel.load(Ordering::SeqCst) {
            log::warn!("cancelled after {} frames", state.frames_read);
            summary.cancelled = true;
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                return Err(SortError::from_anyhow(
                    ErrorKind::Decode,
                    e.context(format!("read frame {}", state.frames_read)),
                ));
            }
        };

        let (position, sampled) = state.advance();
        if !sampled {
            continue;
        }
        summary.frames_sampled += 1;

        match process_frame(settings, detector, frame, position, state.saved_index) {
            Ok(saved) => {
                state.saved_index += 1;
                log::info!(
                    "frame {} max_conf={} -> {}",
                    saved.saved_index,
                    format_confidence(saved.max_confidence),
                    saved.path.display()
                );
                summary.record(&saved);
                observer(&saved);
            }
            Err(err) => match settings.failure_policy {
                FailurePolicy::Abort => return Err(err),
                FailurePolicy::Skip => {
                    log::warn!("skipping source frame {}: {}", position, err);
                    summary.frames_failed += 1;
                }
            },
        }
    }

    summary.frames_read = state.frames_read;
    log::info!(
        "finished processing video: {} read, {} sampled, {} saved, {} failed",
        summary.frames_read,
        summary.frames_sampled,
        summary.frames_saved,
        summary.frames_failed
    );
    Ok(summary)
}

fn process_frame(
    settings: &PipelineSettings,
    detector: &mut dyn DetectorBackend,
    frame: Frame,
    source_index: u64,
    saved_index: u64,
) -> SortResult<SavedFrame> {
    let resized = frame
        .resized(settings.width, settings.height)
        .map_err(|e| SortError::from_anyhow(ErrorKind::Encode, e))?;

    let detections = detector
        .detect(resized.pixels(), resized.width(), resized.height())
        .map_err(|e| SortError::from_anyhow(ErrorKind::Detection, e))?;
    let max_confidence = detections.max_confidence();
    if let Some(confidence) = max_confidence {
        if !confidence.is_finite() {
            return Err(SortError::new(
                ErrorKind::Detection,
                format!("detector returned non-finite confidence {}", confidence),
            ));
        }
    }

    let bucket = ConfidenceBucket::for_max_score(max_confidence).to_string();
    let dir = settings.output_dir.join(&bucket);
    create_bucket_dir(&dir)?;

    let jpeg = resized
        .encode_jpeg(settings.jpeg_quality)
        .map_err(|e| SortError::from_anyhow(ErrorKind::Encode, e))?;
    let path = dir.join(frame_file_name(saved_index));
    std::fs::write(&path, jpeg).map_err(|e| {
        SortError::new(
            ErrorKind::Filesystem,
            format!("failed to write {}: {}", path.display(), e),
        )
    })?;

    Ok(SavedFrame {
        saved_index,
        source_index,
        max_confidence,
        bucket,
        path,
    })
}

// Existing directories are fine; buckets are shared across runs.
fn create_bucket_dir(dir: &Path) -> SortResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        SortError::new(
            ErrorKind::Filesystem,
            format!("failed to create {}: {}", dir.display(), e),
        )
    })
}

fn format_confidence(confidence: Option<f32>) -> String {
    match confidence {
        Some(c) => format!("{:.4}", c),
        None => "none".to_string(),
    }
}
