use std::path::PathBuf;
use std::sync::Arc;

use crate::detection::domain::candidate_detector::CandidateDetector;
use crate::detection::domain::detector_loader::{DetectorLoader, LoadError};
use crate::shared::constants::{FACE_MODEL_NAME, FACE_MODEL_URL};
use crate::shared::model_resolver;
use crate::tracking::tracker_config::TrackerConfig;

use super::onnx_eye_detector::OnnxEyeDetector;
use super::onnx_yolo_detector::OnnxYoloDetector;

/// Loads the ONNX face and eye detectors named by a [`TrackerConfig`].
pub struct OnnxDetectorLoader {
    face_model: String,
    landmark_model: Option<String>,
    model_dirs: Vec<PathBuf>,
    allow_download: bool,
    score_threshold: f64,
    progress: Option<Arc<dyn Fn(u64, u64) + Send + Sync>>,
}

impl OnnxDetectorLoader {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            face_model: config.face_model.clone(),
            landmark_model: config.landmark_model.clone(),
            model_dirs: config.model_dirs.clone(),
            allow_download: config.allow_download,
            score_threshold: config.score_threshold,
            progress: None,
        }
    }

    /// Report `(bytes_downloaded, total_bytes)` while fetching the face model.
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    fn download_url(&self) -> Option<&'static str> {
        // Only the bundled default has a known download location
        let is_default = self.face_model == FACE_MODEL_NAME;
        (self.allow_download && is_default).then_some(FACE_MODEL_URL)
    }
}

impl DetectorLoader for OnnxDetectorLoader {
    fn load_primary(&self) -> Result<Box<dyn CandidateDetector>, LoadError> {
        let progress = self.progress.clone().map(|report| -> model_resolver::ProgressFn {
            Box::new(move |done, total| report(done, total))
        });
        let path = model_resolver::resolve(
            &self.face_model,
            &self.model_dirs,
            self.download_url(),
            progress,
        )?;
        Ok(Box::new(OnnxYoloDetector::new(&path, self.score_threshold)?))
    }

    fn load_secondary(&self) -> Result<Option<Box<dyn CandidateDetector>>, LoadError> {
        let Some(name) = &self.landmark_model else {
            return Ok(None);
        };
        let path = model_resolver::resolve(name, &self.model_dirs, None, None)?;
        Ok(Some(Box::new(OnnxEyeDetector::new(
            &path,
            self.score_threshold,
        )?)))
    }
}
