pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Side length of one identity bucket in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 50;

/// Frame-processing durations kept for the rolling latency average.
pub const DEFAULT_LATENCY_WINDOW: usize = 30;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.0;
pub const DEFAULT_MAX_CONFIDENCE: f64 = 1.0;

/// Square input resolution of the bundled-style mask classifiers.
pub const MASK_CLASSIFIER_INPUT_SIZE: u32 = 224;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
