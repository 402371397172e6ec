//! Frame Sorter
//!
//! Samples a video at a target frame rate, runs object detection on every
//! sampled frame, and files each frame as a JPEG under a folder named for the
//! strongest detection's confidence range.
//!
//! # Output layout
//!
//! ```text
//! outputFolder/
//!   no_detections/frame_00003.jpg
//!   0.7-0.8/frame_00000.jpg
//!   0.7-0.8/frame_00001.jpg
//!   0.9-1.0/frame_00002.jpg
//! ```
//!
//! Frame numbers are shared across folders and restart at zero each run, so
//! a second run over the same output overwrites by name.
//!
//! # Module Structure
//!
//! - `bucket`: confidence to folder name
//! - `frame`: decoded RGB frames, resizing and JPEG encoding
//! - `ingest`: frame sources (local files via FFmpeg, synthetic `stub://`)
//! - `detect`: detector backends (YOLO on tract, fixed scores)
//! - `pipeline`: sampling loop and run summary
//! - `config`: config file and environment layering

pub mod bucket;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;

pub use bucket::{bucket_label, ConfidenceBucket, NO_DETECTIONS};
pub use config::SorterConfig;
pub use detect::{BackendKind, DetectionSet, DetectorBackend, DetectorSettings};
pub use error::{ErrorKind, SortError, SortResult};
pub use frame::Frame;
pub use ingest::FrameSource;
pub use pipeline::{
    run_pipeline, sampling_interval, sort_video, FailurePolicy, PipelineSettings, RunSummary,
    SavedFrame,
};
