pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Environment variable naming an extra model directory, searched first
/// among the non-configured locations.
pub const MODEL_DIR_ENV: &str = "FACETRACK_MODEL_DIR";

/// Confidence tag for an estimate found by scanning the whole frame.
pub const FULL_DETECTION_CONFIDENCE: f64 = 0.8;

/// Confidence tag for an estimate re-acquired near the previous face.
/// Strictly above [`FULL_DETECTION_CONFIDENCE`].
pub const REGION_TRACKING_CONFIDENCE: f64 = 0.85;

/// Consumers treat an estimate above this confidence as a detected face.
pub const DETECTED_THRESHOLD: f64 = 0.5;

/// Smallest face (pixels, both axes) accepted by a full-frame scan.
pub const DEFAULT_MIN_FACE_SIZE: u32 = 80;

/// Smallest ocular feature (pixels, both axes) accepted in a face crop.
pub const DEFAULT_LANDMARK_MIN_SIZE: u32 = 10;

/// Search margin around the previous face, as a fraction of its width.
pub const SEARCH_MARGIN_RATIO: f64 = 0.5;

pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_SMOOTH_FACTOR: f64 = 0.3;

/// Worker period (~30 Hz).
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 33;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
