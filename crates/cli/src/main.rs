use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use facetrack_core::detection::domain::face_estimate::{FaceEstimate, FaceSignal};
use facetrack_core::detection::infrastructure::onnx_detector_loader::OnnxDetectorLoader;
use facetrack_core::shared::constants::IMAGE_EXTENSIONS;
use facetrack_core::shared::frame::Frame;
use facetrack_core::tracking::face_tracker::FaceTracker;
use facetrack_core::tracking::tracker_config::TrackerConfig;
use facetrack_core::tracking::tracking_logger::{StatsTrackingLogger, TrackingLogger};
use facetrack_core::tracking::tracking_worker::{ChannelFrameSource, TrackingWorker};

/// Track a face across an image sequence and print pose signals as JSON lines.
#[derive(Parser)]
#[command(name = "facetrack")]
struct Cli {
    /// Image files or directories of images, processed in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Config file (default: the user config directory's facetrack/config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hysteresis threshold for keeping a face tracked (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Weight of each new estimate in the moving average (0.0-1.0).
    #[arg(long)]
    smooth_factor: Option<f64>,

    /// Scan the whole frame every time instead of tracking.
    #[arg(long)]
    no_tracking: bool,

    /// Smallest face accepted by a full-frame scan, in pixels.
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Extra directory to search for models (repeatable).
    #[arg(long)]
    model_dir: Vec<PathBuf>,

    /// Never download models.
    #[arg(long)]
    offline: bool,

    /// Feed frames to a background worker at the configured update period.
    #[arg(long)]
    realtime: bool,
}

#[derive(Serialize)]
struct FrameReport<'a> {
    index: usize,
    path: &'a Path,
    estimate: &'a FaceEstimate,
    detected: bool,
}

#[derive(Serialize)]
struct SignalReport {
    tick: usize,
    signal: FaceSignal,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    let inputs = collect_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        return Err("No images found in the given inputs".into());
    }
    log::info!("Tracking over {} images", inputs.len());

    let loader = OnnxDetectorLoader::from_config(&config).with_progress(download_progress);
    let tracker = Arc::new(FaceTracker::new(&config, Box::new(loader)));
    tracker.initialize()?;

    if cli.realtime {
        run_realtime(tracker, &inputs, Duration::from_millis(config.update_interval_ms))
    } else {
        run_sequential(&tracker, &inputs)
    }
}

fn run_sequential(tracker: &FaceTracker, inputs: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = StatsTrackingLogger::new();
    for (index, path) in inputs.iter().enumerate() {
        let frame = load_frame(path, index)?;
        let estimate = tracker.estimate_logged(&frame, &mut logger);
        let report = FrameReport {
            index,
            path,
            estimate: &estimate,
            detected: estimate.is_detected(),
        };
        println!("{}", serde_json::to_string(&report)?);
    }
    logger.summary();
    Ok(())
}

fn run_realtime(
    tracker: Arc<FaceTracker>,
    inputs: &[PathBuf],
    period: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let (frame_tx, source) = ChannelFrameSource::bounded(2);
    let mut worker = TrackingWorker::spawn(
        tracker.clone(),
        Box::new(source),
        period,
        Box::new(StatsTrackingLogger::new()),
    );

    let ticker = crossbeam_channel::tick(period);
    for (index, path) in inputs.iter().enumerate() {
        let frame = load_frame(path, index)?;
        // A full channel means the worker is behind; drop rather than block.
        if frame_tx.try_send(frame).is_err() {
            log::debug!("Worker busy, dropped frame {index}");
        }
        ticker.recv()?;
        let report = SignalReport {
            tick: index,
            signal: tracker.signal(),
        };
        println!("{}", serde_json::to_string(&report)?);
    }

    if let Some(logger) = worker.stop() {
        logger.summary();
    }
    Ok(())
}

/// Decode an image into a BGR (or BGRA, when it has alpha) frame.
fn load_frame(path: &Path, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let (width, height) = (img.width(), img.height());

    let frame = if img.color().has_alpha() {
        let mut data = img.into_rgba8().into_raw();
        data.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
        Frame::new(data, width, height, 4, index)
    } else {
        let mut data = img.into_rgb8().into_raw();
        data.chunks_exact_mut(3).for_each(|px| px.swap(0, 2));
        Frame::new(data, width, height, 3, index)
    };
    Ok(frame)
}

/// Expand directories into their images, sorted by path. Files are kept
/// in the order given.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            entries.sort();
            images.extend(entries);
        } else {
            images.push(input.clone());
        }
    }
    Ok(images)
}

fn build_config(cli: &Cli) -> Result<TrackerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::load_or_default(),
    };

    if let Some(confidence) = cli.confidence {
        config.detection_confidence = confidence;
    }
    if let Some(smooth_factor) = cli.smooth_factor {
        config.smooth_factor = smooth_factor;
    }
    if let Some(size) = cli.min_face_size {
        config.min_face_size = size;
    }
    if cli.no_tracking {
        config.tracking_enabled = false;
    }
    if cli.offline {
        config.allow_download = false;
    }
    let mut model_dirs = cli.model_dir.clone();
    model_dirs.append(&mut config.model_dirs);
    config.model_dirs = model_dirs;
    Ok(config.sanitized())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
        if input.is_file() && !is_image(input) {
            return Err(format!("Not a supported image: {}", input.display()).into());
        }
    }
    if let Some(c) = cli.confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(format!("Confidence must be between 0.0 and 1.0, got {c}").into());
        }
    }
    if let Some(s) = cli.smooth_factor {
        if !(0.0..=1.0).contains(&s) {
            return Err(format!("Smooth factor must be between 0.0 and 1.0, got {s}").into());
        }
    }
    if cli.min_face_size == Some(0) {
        return Err("Minimum face size must be positive".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
