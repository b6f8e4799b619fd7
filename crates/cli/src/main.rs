use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use maskwatch_core::classification::domain::mask_classifier::MaskClassifier;
use maskwatch_core::classification::infrastructure::skin_tone_mask_classifier::SkinToneMaskClassifier;
use maskwatch_core::detection::domain::face_locator::FaceLocator;
use maskwatch_core::detection::infrastructure::replay_face_locator::ReplayFaceLocator;
use maskwatch_core::pipeline::detection_session::{DetectionSession, SessionSummary};
use maskwatch_core::pipeline::frame_result::FrameResult;
use maskwatch_core::pipeline::frame_scheduler::scheduler_for;
use maskwatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use maskwatch_core::shared::session_config::{ConfigError, SessionConfig};
use maskwatch_core::video::domain::frame_source::FrameSource;
use maskwatch_core::video::infrastructure::image_sequence_source::{
    is_image_path, ImageSequenceSource,
};

/// Face mask detection on image sequences and video streams.
#[derive(Parser)]
#[command(name = "maskwatch")]
struct Cli {
    /// Image, directory of images, or (ffmpeg builds) a video file or stream URL.
    input: PathBuf,

    /// JSON session config; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Identity bucket size in pixels.
    #[arg(long)]
    bucket_size: Option<u32>,

    /// Number of frames averaged for the latency metric.
    #[arg(long)]
    latency_window: Option<usize>,

    /// Pace processing to this many frames per second.
    #[arg(long)]
    target_fps: Option<f64>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Mask classifier: heuristic or onnx.
    #[arg(long, default_value = "heuristic")]
    classifier: String,

    /// Two-class mask model (required with --classifier onnx).
    #[arg(long)]
    mask_model: Option<PathBuf>,

    /// Replay face boxes from a JSON file instead of running the detector.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.25")]
    face_confidence: f64,

    /// Write one JSON frame result per line to this file.
    #[arg(long)]
    results: Option<PathBuf>,
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

    let source = open_source(&cli.input)?;
    let locator = build_locator(&cli)?;
    let classifier = build_classifier(&cli)?;
    let mut session = DetectionSession::new(source, locator, classifier, config.clone())?
        .with_logger(Box::new(StdoutPipelineLogger::default()));

    let stop = session.stop_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping...");
        stop.request_stop();
    })?;

    let mut results = match &cli.results {
        Some(path) => Some(ResultsWriter::create(path)?),
        None => None,
    };
    let mut write_error = None;
    let mut frames = 0usize;
    let max_frames = cli.max_frames;

    let mut scheduler = scheduler_for(config.target_fps);
    let summary = session.run(scheduler.as_mut(), |result| {
        frames += 1;
        log::debug!(
            "Frame {}: {} faces, {} masked, {} fps",
            result.frame_index,
            result.face_count,
            result.with_mask_count,
            result.fps
        );
        if let Some(writer) = results.as_mut() {
            if let Err(e) = writer.write(result) {
                write_error = Some(e);
                return false;
            }
        }
        max_frames.map_or(true, |max| frames < max)
    })?;

    if let Some(e) = write_error {
        return Err(format!("Failed to write results: {e}").into());
    }
    if let Some(writer) = results {
        writer.finish()?;
    }
    report(&summary);
    Ok(())
}

struct ResultsWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl ResultsWriter {
    fn create(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::create(path)
            .map_err(|e| format!("Cannot create results file {}: {e}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        })
    }

    fn write(&mut self, result: &FrameResult) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, result)?;
        writeln!(self.out)
    }

    fn finish(mut self) -> std::io::Result<()> {
        self.out.flush()?;
        log::info!("Frame results written to {}", self.path.display());
        Ok(())
    }
}

fn report(summary: &SessionSummary) {
    let compliance = match summary.compliance_rate {
        Some(rate) => format!("{:.1}%", rate * 100.0),
        None => "n/a".to_string(),
    };
    log::info!(
        "{} frames, {} faces ({} with mask, {} without), compliance {compliance}, avg latency {:.1}ms",
        summary.frames,
        summary.counters.total_detections,
        summary.counters.with_mask_total,
        summary.counters.without_mask_total,
        summary.average_latency_ms
    );
}

fn build_config(cli: &Cli) -> Result<SessionConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(bucket_size) = cli.bucket_size {
        config.bucket_size = bucket_size;
    }
    if let Some(window) = cli.latency_window {
        config.latency_window = window;
    }
    if cli.target_fps.is_some() {
        config.target_fps = cli.target_fps;
    }
    config.validate()?;
    Ok(config)
}

fn open_source(input: &Path) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if input.is_dir() || is_image_path(input) {
        Ok(Box::new(ImageSequenceSource::new(input)))
    } else {
        open_video_source(input)
    }
}

#[cfg(feature = "ffmpeg")]
fn open_video_source(input: &Path) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use maskwatch_core::video::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
    Ok(Box::new(FfmpegFrameSource::new(input)))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video_source(input: &Path) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err(format!(
        "Video input {} needs a build with the `ffmpeg` feature",
        input.display()
    )
    .into())
}

fn build_locator(cli: &Cli) -> Result<Box<dyn FaceLocator>, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.detections {
        let locator = ReplayFaceLocator::from_json_file(path)?;
        log::info!("Replaying detections for {} frames", locator.frame_count());
        return Ok(Box::new(locator));
    }
    build_yolo_locator(cli)
}

#[cfg(feature = "onnx")]
fn build_yolo_locator(cli: &Cli) -> Result<Box<dyn FaceLocator>, Box<dyn std::error::Error>> {
    use maskwatch_core::detection::infrastructure::onnx_yolo_locator::OnnxYoloLocator;
    use maskwatch_core::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
    use maskwatch_core::shared::model_resolver;

    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path =
        model_resolver::resolve(YOLO_MODEL_NAME, YOLO_MODEL_URL, Some(Box::new(download_progress)))?;
    eprintln!();
    Ok(Box::new(OnnxYoloLocator::new(
        &model_path,
        cli.face_confidence,
    )?))
}

#[cfg(not(feature = "onnx"))]
fn build_yolo_locator(_cli: &Cli) -> Result<Box<dyn FaceLocator>, Box<dyn std::error::Error>> {
    Err("Face detection needs a build with the `onnx` feature; use --detections to replay boxes".into())
}

fn build_classifier(cli: &Cli) -> Result<Box<dyn MaskClassifier>, Box<dyn std::error::Error>> {
    match cli.classifier.as_str() {
        "onnx" => build_onnx_classifier(cli),
        _ => Ok(Box::new(SkinToneMaskClassifier::default())),
    }
}

#[cfg(feature = "onnx")]
fn build_onnx_classifier(cli: &Cli) -> Result<Box<dyn MaskClassifier>, Box<dyn std::error::Error>> {
    use maskwatch_core::classification::infrastructure::onnx_mask_classifier::OnnxMaskClassifier;

    let model = cli
        .mask_model
        .as_deref()
        .ok_or("--mask-model is required with --classifier onnx")?;
    Ok(Box::new(OnnxMaskClassifier::new(model)?))
}

#[cfg(not(feature = "onnx"))]
fn build_onnx_classifier(_cli: &Cli) -> Result<Box<dyn MaskClassifier>, Box<dyn std::error::Error>> {
    Err("--classifier onnx needs a build with the `onnx` feature".into())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let is_url = cli.input.to_string_lossy().contains("://");
    if !is_url && !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if cli.classifier != "heuristic" && cli.classifier != "onnx" {
        return Err(format!(
            "Classifier must be 'heuristic' or 'onnx', got '{}'",
            cli.classifier
        )
        .into());
    }
    if cli.classifier == "onnx" && cli.mask_model.is_none() {
        return Err("--mask-model is required with --classifier onnx".into());
    }
    if !(0.0..=1.0).contains(&cli.face_confidence) {
        return Err(format!(
            "Face confidence must be between 0.0 and 1.0, got {}",
            cli.face_confidence
        )
        .into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    if let Some(fps) = cli.target_fps {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(format!("Target fps must be positive, got {fps}").into());
        }
    }
    Ok(())
}

#[cfg(feature = "onnx")]
fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["maskwatch"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&["in.png", "--bucket-size", "40", "--target-fps", "15"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.bucket_size, 40);
        assert_eq!(config.target_fps, Some(15.0));
        assert_eq!(config.latency_window, 30);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{ "bucket_size": 45, "latency_window": 10 }"#).unwrap();

        let cli = parse(&["in.png", "--config", path.to_str().unwrap(), "--latency-window", "5"]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.bucket_size, 45);
        assert_eq!(config.latency_window, 5);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = parse(&["in.png", "--bucket-size", "0"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().to_str().unwrap().to_string();
        let cli = parse(&[&input, "--classifier", "random"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_validate_requires_mask_model_for_onnx() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().to_str().unwrap().to_string();
        let cli = parse(&[&input, "--classifier", "onnx"]);
        let err = validate(&cli).unwrap_err();
        assert!(err.to_string().contains("--mask-model"));
    }

    #[test]
    fn test_validate_missing_input() {
        let cli = parse(&["/nonexistent/frames"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_validate_accepts_stream_url() {
        let cli = parse(&["rtsp://camera.local/stream"]);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_directory_input_uses_image_sequence() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_source(dir.path()).is_ok());
    }
}
