use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::{BackendKind, DetectorSettings, YoloParams};
use crate::error::{ErrorKind, SortError};
use crate::pipeline::{FailurePolicy, PipelineSettings};

pub const CONFIG_ENV: &str = "FRAME_SORTER_CONFIG";

#[derive(Debug, Deserialize, Default)]
struct SorterConfigFile {
    video: Option<String>,
    output_dir: Option<PathBuf>,
    sampling: Option<SamplingConfigFile>,
    detector: Option<DetectorConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SamplingConfigFile {
    target_fps: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    jpeg_quality: Option<u8>,
    on_frame_error: Option<FailurePolicy>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<BackendKind>,
    model: Option<PathBuf>,
    fixed_confidences: Option<Vec<f32>>,
    yolo: Option<YoloParams>,
}

/// Resolved settings for one sorting run.
#[derive(Debug, Clone, PartialEq)]
pub struct SorterConfig {
    /// Required before a run; may come from the file, env or CLI.
    pub video: Option<String>,
    pub pipeline: PipelineSettings,
    pub detector: DetectorSettings,
}

impl SorterConfig {
    /// Defaults, then the file named by `FRAME_SORTER_CONFIG`, then env, validated.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok();
        let cfg = Self::resolve(config_path.as_deref().map(Path::new))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Layer an optional config file and the environment over the defaults.
    ///
    /// Not validated, so callers can apply further overrides first.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => SorterConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn from_file(file: SorterConfigFile) -> Self {
        let defaults = PipelineSettings::default();
        let sampling = file.sampling.unwrap_or_default();
        let pipeline = PipelineSettings {
            output_dir: file.output_dir.unwrap_or(defaults.output_dir),
            target_fps: sampling.target_fps.unwrap_or(defaults.target_fps),
            width: sampling.width.unwrap_or(defaults.width),
            height: sampling.height.unwrap_or(defaults.height),
            jpeg_quality: sampling.jpeg_quality.unwrap_or(defaults.jpeg_quality),
            failure_policy: sampling.on_frame_error.unwrap_or(defaults.failure_policy),
        };

        let defaults = DetectorSettings::default();
        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or(defaults.backend),
            model_path: detector_file.model.unwrap_or(defaults.model_path),
            yolo: detector_file.yolo.unwrap_or(defaults.yolo),
            fixed_confidences: detector_file
                .fixed_confidences
                .unwrap_or(defaults.fixed_confidences),
        };

        Self {
            video: file.video,
            pipeline,
            detector,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(video) = non_empty_env("FRAME_SORTER_VIDEO") {
            self.video = Some(video);
        }
        if let Some(dir) = non_empty_env("FRAME_SORTER_OUTPUT_DIR") {
            self.pipeline.output_dir = PathBuf::from(dir);
        }
        if let Some(model) = non_empty_env("FRAME_SORTER_MODEL") {
            self.detector.model_path = PathBuf::from(model);
        }
        if let Some(backend) = non_empty_env("FRAME_SORTER_BACKEND") {
            self.detector.backend = backend.parse()?;
        }
        if let Some(fps) = non_empty_env("FRAME_SORTER_TARGET_FPS") {
            self.pipeline.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("FRAME_SORTER_TARGET_FPS must be a number"))?;
        }
        if let Some(width) = non_empty_env("FRAME_SORTER_WIDTH") {
            self.pipeline.width = width
                .parse()
                .map_err(|_| anyhow!("FRAME_SORTER_WIDTH must be an integer number of pixels"))?;
        }
        if let Some(height) = non_empty_env("FRAME_SORTER_HEIGHT") {
            self.pipeline.height = height
                .parse()
                .map_err(|_| anyhow!("FRAME_SORTER_HEIGHT must be an integer number of pixels"))?;
        }
        if let Some(quality) = non_empty_env("FRAME_SORTER_JPEG_QUALITY") {
            self.pipeline.jpeg_quality = quality
                .parse()
                .map_err(|_| anyhow!("FRAME_SORTER_JPEG_QUALITY must be an integer in 1..=100"))?;
        }
        if let Some(policy) = non_empty_env("FRAME_SORTER_ON_FRAME_ERROR") {
            self.pipeline.failure_policy = policy.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        match self.video.as_deref() {
            Some(video) if !video.trim().is_empty() => {}
            _ => {
                return Err(SortError::new(
                    ErrorKind::Config,
                    "a video path is required (--video or FRAME_SORTER_VIDEO)",
                )
                .into())
            }
        }
        self.pipeline.validate()?;
        if let Some(bad) = self
            .detector
            .fixed_confidences
            .iter()
            .find(|c| !c.is_finite())
        {
            return Err(SortError::new(
                ErrorKind::Config,
                format!("fixed confidences must be finite, got {}", bad),
            )
            .into());
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<SorterConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
