use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::estimate_smoother::clamp_unit;
use crate::shared::constants::{
    DEFAULT_DETECTION_CONFIDENCE, DEFAULT_LANDMARK_MIN_SIZE, DEFAULT_MIN_FACE_SIZE,
    DEFAULT_SMOOTH_FACTOR, DEFAULT_UPDATE_INTERVAL_MS, FACE_MODEL_NAME,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunables for a [`FaceTracker`](super::face_tracker::FaceTracker) session.
///
/// Missing fields in a config file take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub tracking_enabled: bool,
    pub detection_confidence: f64,
    pub smooth_factor: f64,
    pub min_face_size: u32,
    pub landmark_min_size: u32,
    pub update_interval_ms: u64,
    pub face_model: String,
    pub landmark_model: Option<String>,
    pub model_dirs: Vec<PathBuf>,
    pub allow_download: bool,
    pub score_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracking_enabled: true,
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE,
            smooth_factor: DEFAULT_SMOOTH_FACTOR,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            landmark_min_size: DEFAULT_LANDMARK_MIN_SIZE,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            face_model: FACE_MODEL_NAME.to_string(),
            landmark_model: Some(FACE_MODEL_NAME.to_string()),
            model_dirs: Vec::new(),
            allow_download: true,
            score_threshold: 0.25,
        }
    }
}

impl TrackerConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("facetrack").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.sanitized())
    }

    /// The user config file if present and valid, defaults otherwise.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path().filter(|p| p.is_file()) else {
            return Self::default();
        };
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!("{e}; using defaults");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Clamp unit-range fields to `[0, 1]` and keep sizes and the period
    /// positive.
    pub fn sanitized(mut self) -> Self {
        self.detection_confidence = clamp_unit(self.detection_confidence);
        self.smooth_factor = clamp_unit(self.smooth_factor);
        self.score_threshold = clamp_unit(self.score_threshold);
        self.min_face_size = self.min_face_size.max(1);
        self.landmark_min_size = self.landmark_min_size.max(1);
        self.update_interval_ms = self.update_interval_ms.max(1);
        self
    }
}
