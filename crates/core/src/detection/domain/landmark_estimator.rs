//! Ocular landmarks and the in-plane roll derived from them.
//!
//! The first two emitted points are taken as a left/right pair without any
//! spatial sorting, so a detector that flips its emission order flips the
//! sign of the estimate.

use image::GrayImage;

use crate::detection::domain::candidate_detector::{CandidateDetector, SizeBounds};

pub struct LandmarkEstimator {
    detector: Option<Box<dyn CandidateDetector>>,
    min_feature_size: u32,
}

impl LandmarkEstimator {
    pub fn new(detector: Option<Box<dyn CandidateDetector>>, min_feature_size: u32) -> Self {
        Self {
            detector,
            min_feature_size,
        }
    }

    pub fn is_available(&self) -> bool {
        self.detector.is_some()
    }

    /// Centers of every feature candidate in `face_region`, in region-local
    /// pixels and detector emission order.
    ///
    /// Centers outside the region are dropped. An absent detector, a failed
    /// pass and an empty result all yield an empty list.
    pub fn landmarks(&mut self, face_region: &GrayImage) -> Vec<(f64, f64)> {
        let Some(detector) = self.detector.as_mut() else {
            return Vec::new();
        };
        if face_region.width() == 0 || face_region.height() == 0 {
            return Vec::new();
        }

        let bounds = SizeBounds::at_least(self.min_feature_size, self.min_feature_size);
        match detector.detect(face_region, bounds) {
            Ok(features) => {
                let (w, h) = (face_region.width() as f64, face_region.height() as f64);
                features
                    .iter()
                    .map(|r| r.center())
                    .filter(|&(x, y)| (0.0..=w).contains(&x) && (0.0..=h).contains(&y))
                    .collect()
            }
            Err(e) => {
                log::warn!("Landmark pass failed, skipping rotation: {e}");
                Vec::new()
            }
        }
    }
}

/// Roll angle from the first to the second landmark, `atan2(dy, dx)`.
///
/// Returns 0.0 with fewer than two points.
pub fn rotation(landmarks: &[(f64, f64)]) -> f64 {
    match landmarks {
        [left, right, ..] => (right.1 - left.1).atan2(right.0 - left.0),
        _ => 0.0,
    }
}
