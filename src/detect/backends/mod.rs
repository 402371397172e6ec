pub mod fixed;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use fixed::FixedBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
