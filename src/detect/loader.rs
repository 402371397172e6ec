use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use super::backend::DetectorBackend;
use super::backends::FixedBackend;
use super::yolo::YoloParams;

/// Which detector implementation to construct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// YOLO ONNX model executed by tract (feature `backend-tract`).
    #[default]
    Tract,
    /// Scripted confidences, no model.
    Fixed,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Tract => "tract",
            BackendKind::Fixed => "fixed",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tract" => Ok(BackendKind::Tract),
            "fixed" => Ok(BackendKind::Fixed),
            other => Err(anyhow!(
                "unknown detector backend '{}' (expected tract|fixed)",
                other
            )),
        }
    }
}

/// Everything needed to construct a detector.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSettings {
    pub backend: BackendKind,
    /// ONNX weights, used by the tract backend.
    pub model_path: PathBuf,
    pub yolo: YoloParams,
    /// Confidences reported for every frame by the fixed backend.
    pub fixed_confidences: Vec<f32>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Tract,
            model_path: PathBuf::from("best.onnx"),
            yolo: YoloParams::default(),
            fixed_confidences: Vec::new(),
        }
    }
}

impl DetectorSettings {
    /// Settings for a fixed backend reporting `confidences` on every frame.
    pub fn fixed(confidences: Vec<f32>) -> Self {
        Self {
            backend: BackendKind::Fixed,
            fixed_confidences: confidences,
            ..Self::default()
        }
    }
}

/// Construct and warm up the configured detector.
pub fn load(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let mut backend: Box<dyn DetectorBackend> = match settings.backend {
        BackendKind::Fixed => Box::new(FixedBackend::new(settings.fixed_confidences.clone())),
        BackendKind::Tract => load_tract(settings)?,
    };
    let name = backend.name();
    backend
        .warm_up()
        .with_context(|| format!("failed to warm up {} backend", name))?;
    log::info!("detector backend '{}' ready", name);
    Ok(backend)
}

#[cfg(feature = "backend-tract")]
fn load_tract(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    if !settings.model_path.is_file() {
        return Err(anyhow!(
            "model file {} does not exist",
            settings.model_path.display()
        ));
    }
    log::info!("loading ONNX model {}", settings.model_path.display());
    let backend = super::backends::TractBackend::new(&settings.model_path, settings.yolo.clone())?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn load_tract(_settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "the tract detector requires the backend-tract feature"
    ))
}
