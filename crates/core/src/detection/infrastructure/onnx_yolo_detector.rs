use std::path::Path;

use image::GrayImage;

use crate::detection::domain::candidate_detector::{CandidateDetector, DetectError, SizeBounds};
use crate::shared::pixel_rect::PixelRect;

use super::yolo_session::{RawDetection, YoloSession};

/// Face candidates from a YOLO face-pose ONNX model.
///
/// Candidates come out in descending score order after NMS, restricted to
/// the requested size bounds.
pub struct OnnxYoloDetector {
    session: YoloSession,
}

impl OnnxYoloDetector {
    pub fn new(model_path: &Path, score_threshold: f64) -> Result<Self, DetectError> {
        Ok(Self {
            session: YoloSession::load(model_path, score_threshold)?,
        })
    }
}

impl CandidateDetector for OnnxYoloDetector {
    fn detect(
        &mut self,
        image: &GrayImage,
        bounds: SizeBounds,
    ) -> Result<Vec<PixelRect>, DetectError> {
        let detections = self.session.infer(image)?;
        Ok(face_boxes(&detections, bounds))
    }
}

fn face_boxes(detections: &[RawDetection], bounds: SizeBounds) -> Vec<PixelRect> {
    detections
        .iter()
        .map(|d| {
            let x = d.x1.round() as i32;
            let y = d.y1.round() as i32;
            PixelRect::new(
                x,
                y,
                (d.x2.round() as i32).saturating_sub(x),
                (d.y2.round() as i32).saturating_sub(y),
            )
        })
        .filter(|r| !r.is_degenerate() && bounds.admits(r))
        .collect()
}
