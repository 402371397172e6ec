mod backend;
mod backends;
mod loader;
mod result;
pub mod yolo;

pub use backend::DetectorBackend;
pub use backends::FixedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use loader::{load, BackendKind, DetectorSettings};
pub use result::{Detection, DetectionSet};
pub use yolo::YoloParams;
