use std::path::Path;

use image::GrayImage;

use crate::detection::domain::candidate_detector::{CandidateDetector, DetectError, SizeBounds};
use crate::shared::pixel_rect::PixelRect;

use super::yolo_session::{RawDetection, YoloSession};

/// Eye box side relative to the inter-ocular distance.
const EYE_BOX_RATIO: f64 = 0.5;

/// Eye candidates read from the face-pose model's ocular keypoints.
///
/// Runs the pose model on the face crop and turns the two eye keypoints of
/// the strongest face into square boxes centered on each eye, emitted as
/// `[left_eye, right_eye]`.
pub struct OnnxEyeDetector {
    session: YoloSession,
}

impl OnnxEyeDetector {
    pub fn new(model_path: &Path, score_threshold: f64) -> Result<Self, DetectError> {
        Ok(Self {
            session: YoloSession::load(model_path, score_threshold)?,
        })
    }
}

impl CandidateDetector for OnnxEyeDetector {
    fn detect(
        &mut self,
        image: &GrayImage,
        bounds: SizeBounds,
    ) -> Result<Vec<PixelRect>, DetectError> {
        let detections = self.session.infer(image)?;
        Ok(detections
            .first()
            .map(|d| eye_boxes(d, bounds))
            .unwrap_or_default())
    }
}

fn eye_boxes(detection: &RawDetection, bounds: SizeBounds) -> Vec<PixelRect> {
    let [Some(left), Some(right), ..] = detection.keypoints else {
        return Vec::new();
    };
    let distance = (right.0 - left.0).hypot(right.1 - left.1);
    let side = (distance * EYE_BOX_RATIO).round().max(bounds.min.0.max(bounds.min.1) as f64);
    if side < 1.0 {
        return Vec::new();
    }

    let square = |(cx, cy): (f64, f64)| {
        let s = side as i32;
        PixelRect::new(
            (cx - side / 2.0).round() as i32,
            (cy - side / 2.0).round() as i32,
            s,
            s,
        )
    };
    [square(left), square(right)]
        .into_iter()
        .filter(|r| bounds.admits(r))
        .collect()
}
