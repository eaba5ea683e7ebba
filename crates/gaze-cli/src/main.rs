mod config;
mod render;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use gaze_core::{Device, FrameResult, GazePipeline, ModelCatalog, OrtProvider, PipelineConfig};
use render::Renderer;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "gaze", about = "Face, head-pose and gaze estimation CLI")]
struct Cli {
    /// Directory containing the ONNX models (overrides GAZE_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
    /// Execution device: cpu, cuda, openvino, coreml (overrides GAZE_DEVICE)
    #[arg(long, global = true)]
    device: Option<String>,
    /// Face detection confidence threshold (overrides GAZE_CONFIDENCE_THRESHOLD)
    #[arg(long, global = true)]
    threshold: Option<f32>,
    /// Run the per-face models concurrently
    #[arg(long, global = true)]
    parallel: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on still images and print one JSON result per image
    Detect {
        /// Images to process
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Write annotated copies here
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Run the pipeline on the camera until Ctrl-C
    Live {
        /// Stop after this many frames
        #[arg(short, long)]
        frames: Option<u64>,
        /// Write annotated frames here
        #[arg(long)]
        record_dir: Option<PathBuf>,
        /// Print each frame's result as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Show which models are present in the model directory
    Models,
    /// List V4L2 capture devices
    Cameras,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }
    if let Some(device) = cli.device {
        config.device = device;
    }
    if let Some(threshold) = cli.threshold {
        config.confidence_threshold = threshold;
    }
    config.parallel_face_models |= cli.parallel;

    match cli.command {
        Commands::Detect { images, output_dir } => detect(&config, &images, output_dir.as_deref()),
        Commands::Live {
            frames,
            record_dir,
            json,
        } => live(&config, frames, record_dir.as_deref(), json),
        Commands::Models => {
            models(&config);
            Ok(())
        }
        Commands::Cameras => {
            cameras();
            Ok(())
        }
    }
}

fn load_pipeline(config: &Config) -> Result<GazePipeline> {
    let device: Device = config
        .device
        .parse()
        .with_context(|| format!("invalid device {:?}", config.device))?;
    let provider = OrtProvider::new(config.intra_threads);
    let catalog = ModelCatalog::new(&config.model_dir);
    let pipeline_config = PipelineConfig {
        confidence_threshold: config.confidence_threshold,
        parallel_face_models: config.parallel_face_models,
        ..PipelineConfig::default()
    };

    let started = Instant::now();
    let pipeline = GazePipeline::load(&provider, &catalog, device, pipeline_config)
        .with_context(|| format!("failed to load models from {}", config.model_dir.display()))?;
    tracing::info!(
        %device,
        parallel = config.parallel_face_models,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pipeline ready"
    );
    Ok(pipeline)
}

fn renderer(config: &Config) -> Result<Renderer> {
    Renderer::new(config.font_path.as_deref(), config.arrow_length, config.axis_length)
}

fn detect(config: &Config, images: &[PathBuf], output_dir: Option<&Path>) -> Result<()> {
    let mut pipeline = load_pipeline(config)?;
    let renderer = output_dir.map(|_| renderer(config)).transpose()?;
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    for path in images {
        let mut frame = image::open(path)
            .with_context(|| format!("failed to read {}", path.display()))?
            .to_rgb8();

        let started = Instant::now();
        let result = pipeline
            .run(&frame)
            .with_context(|| format!("pipeline failed on {}", path.display()))?;
        tracing::info!(
            image = %path.display(),
            faces = result.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "processed image"
        );
        println!("{}", serde_json::to_string(&result)?);

        if let (Some(dir), Some(renderer)) = (output_dir, &renderer) {
            renderer.draw(&mut frame, &result);
            let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
            let out = dir.join(format!("{stem}.png"));
            frame
                .save(&out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::debug!(path = %out.display(), "wrote annotated image");
        }
    }

    Ok(())
}

fn live(config: &Config, max_frames: Option<u64>, record_dir: Option<&Path>, json: bool) -> Result<()> {
    let mut pipeline = load_pipeline(config)?;
    let renderer = record_dir.map(|_| renderer(config)).transpose()?;
    if let Some(dir) = record_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let camera = gaze_hw::Camera::open(&config.camera_device)
        .with_context(|| format!("failed to open camera {}", config.camera_device))?;
    let mut stream = camera.stream()?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, stopping");
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let mut fps = FpsCounter::default();
    let mut processed = 0u64;
    while running.load(Ordering::SeqCst) && max_frames.map_or(true, |n| processed < n) {
        let frame = stream.next_frame()?;
        let mut image = frame.image;
        let result = pipeline.run(&image)?;
        let current_fps = fps.tick();
        processed += 1;

        tracing::info!(
            seq = frame.sequence,
            faces = result.len(),
            fps = current_fps,
            "frame"
        );
        if json {
            println!("{}", serde_json::to_string(&result)?);
        }
        if let (Some(dir), Some(renderer)) = (record_dir, &renderer) {
            record(dir, renderer, &mut image, &result, current_fps, processed)?;
        }
    }

    if processed == 0 && max_frames != Some(0) {
        bail!("no frames captured from {}", config.camera_device);
    }
    tracing::info!(frames = processed, "live capture stopped");
    Ok(())
}

fn record(
    dir: &Path,
    renderer: &Renderer,
    image: &mut image::RgbImage,
    result: &FrameResult,
    fps: f64,
    index: u64,
) -> Result<()> {
    renderer.draw(image, result);
    renderer.draw_fps(image, fps);
    let out = dir.join(format!("frame_{index:06}.png"));
    image
        .save(&out)
        .with_context(|| format!("failed to write {}", out.display()))
}

fn models(config: &Config) {
    let catalog = ModelCatalog::new(&config.model_dir);
    println!("Model directory: {}", catalog.model_dir().display());
    for entry in catalog.inventory() {
        let status = if entry.present { "ok" } else { "MISSING" };
        println!(
            "  {:<16} {:<8} {}  ({})",
            entry.kind.to_string(),
            status,
            entry.path.display(),
            entry.kind.description()
        );
    }
}

fn cameras() {
    let devices = gaze_hw::list_devices();
    if devices.is_empty() {
        println!("No V4L2 capture devices found");
        return;
    }
    for dev in devices {
        println!("{}  {} [{}] {}", dev.path, dev.name, dev.driver, dev.bus);
    }
}

/// Exponentially smoothed frames-per-second.
#[derive(Default)]
struct FpsCounter {
    last: Option<Instant>,
    fps: f64,
}

impl FpsCounter {
    const SMOOTHING: f64 = 0.9;

    fn tick(&mut self) -> f64 {
        let now = Instant::now();
        if let Some(last) = self.last.replace(now) {
            let secs = now.duration_since(last).as_secs_f64();
            if secs > 0.0 {
                let instant = 1.0 / secs;
                self.fps = if self.fps == 0.0 {
                    instant
                } else {
                    Self::SMOOTHING * self.fps + (1.0 - Self::SMOOTHING) * instant
                };
            }
        }
        self.fps
    }
}
