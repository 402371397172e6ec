//! sort_frames - Sort sampled video frames by detection confidence.
//!
//! This tool:
//! 1. Resolves settings (defaults < config file < FRAME_SORTER_* env < flags)
//! 2. Loads the detector and opens the video
//! 3. Saves every sampled frame as `<output>/<bucket>/frame_NNNNN.jpg`
//!
//! Ctrl-C stops after the current frame; frames already written stay.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use frame_sorter::{sort_video, BackendKind, FailurePolicy, SorterConfig};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "sort_frames",
    about = "Sort sampled video frames into folders by detection confidence"
)]
struct Args {
    /// Video file to sample, or stub://<frames>@<fps> for a synthetic source
    #[arg(long, value_name = "PATH")]
    video: Option<String>,

    /// Base directory for bucket folders [default: outputFolder]
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// ONNX model weights [default: best.onnx]
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Detector backend (tract|fixed) [default: tract]
    #[arg(long, value_name = "NAME")]
    backend: Option<BackendKind>,

    /// Confidence reported on every frame by the fixed backend (repeatable)
    #[arg(long = "fixed-confidence", value_name = "SCORE")]
    fixed_confidence: Vec<f32>,

    /// Frames sampled per second of video [default: 3]
    #[arg(long, value_name = "FPS")]
    target_fps: Option<f64>,

    /// Output frame width [default: 640]
    #[arg(long, value_name = "PX")]
    width: Option<u32>,

    /// Output frame height [default: 380]
    #[arg(long, value_name = "PX")]
    height: Option<u32>,

    /// JPEG quality 1-100 [default: 99]
    #[arg(long, value_name = "Q")]
    quality: Option<u8>,

    /// What to do when a sampled frame fails (abort|skip) [default: abort]
    #[arg(long, value_name = "POLICY")]
    on_frame_error: Option<FailurePolicy>,

    /// JSON or TOML config file
    #[arg(long, env = "FRAME_SORTER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

impl Args {
    fn apply(&self, cfg: &mut SorterConfig) {
        if let Some(video) = &self.video {
            cfg.video = Some(video.clone());
        }
        if let Some(output) = &self.output {
            cfg.pipeline.output_dir = output.clone();
        }
        if let Some(model) = &self.model {
            cfg.detector.model_path = model.clone();
        }
        if let Some(backend) = self.backend {
            cfg.detector.backend = backend;
        }
        if !self.fixed_confidence.is_empty() {
            cfg.detector.fixed_confidences = self.fixed_confidence.clone();
        }
        if let Some(fps) = self.target_fps {
            cfg.pipeline.target_fps = fps;
        }
        if let Some(width) = self.width {
            cfg.pipeline.width = width;
        }
        if let Some(height) = self.height {
            cfg.pipeline.height = height;
        }
        if let Some(quality) = self.quality {
            cfg.pipeline.jpeg_quality = quality;
        }
        if let Some(policy) = self.on_frame_error {
            cfg.pipeline.failure_policy = policy;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, args.json || !stdout_is_tty);

    let (cfg, video) = {
        let _stage = ui.stage("Resolve settings");
        let mut cfg = SorterConfig::resolve(args.config.as_deref())?;
        args.apply(&mut cfg);
        cfg.validate()?;
        let video = cfg.video.clone().unwrap_or_default();
        (cfg, video)
    };

    std::fs::create_dir_all(&cfg.pipeline.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            cfg.pipeline.output_dir.display()
        )
    })?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::SeqCst);
        })
        .context("error setting Ctrl-C handler")?;
    }

    log::info!(
        "sorting {} with {} backend into {}",
        video,
        cfg.detector.backend,
        cfg.pipeline.output_dir.display()
    );
    let summary = {
        let mut progress = ui.frames("Sort frames");
        sort_video(&video, &cfg.detector, &cfg.pipeline, &cancel, |saved| {
            progress.saved(saved)
        })?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "sort_frames: {} frame(s) saved from {} read (every {} at {:.3} fps)",
            summary.frames_saved,
            summary.frames_read,
            summary.sampling_interval,
            summary.source_frame_rate
        );
        for (bucket, count) in &summary.bucket_counts {
            println!("  {:<14} {}", bucket, count);
        }
        if summary.frames_failed > 0 {
            println!("  skipped        {}", summary.frames_failed);
        }
        if summary.cancelled {
            println!("  (cancelled)");
        }
    }

    Ok(())
}
