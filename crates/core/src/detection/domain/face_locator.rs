//! Per-frame face acquisition: full-frame scan or re-acquisition near the
//! previous face.
//!
//! A full scan picks the largest candidate. Region tracking searches only
//! a margin around the previous face and picks the candidate closest to
//! it. Every failure path falls through to a full scan, and a full scan
//! with no candidates yields the default estimate.

use image::imageops;
use image::GrayImage;

use crate::detection::domain::candidate_detector::{CandidateDetector, SizeBounds};
use crate::detection::domain::face_estimate::FaceEstimate;
use crate::detection::domain::landmark_estimator::{self, LandmarkEstimator};
use crate::shared::constants::{
    FULL_DETECTION_CONFIDENCE, REGION_TRACKING_CONFIDENCE, SEARCH_MARGIN_RATIO,
};
use crate::shared::pixel_rect::PixelRect;

pub struct FaceLocator {
    detector: Box<dyn CandidateDetector>,
    landmarks: LandmarkEstimator,
    min_face_size: u32,
}

impl FaceLocator {
    pub fn new(
        detector: Box<dyn CandidateDetector>,
        landmarks: LandmarkEstimator,
        min_face_size: u32,
    ) -> Self {
        Self {
            detector,
            landmarks,
            min_face_size,
        }
    }

    /// One raw estimate for `image`. Region tracking is attempted only
    /// when `use_tracking` is set.
    pub fn estimate(
        &mut self,
        image: &GrayImage,
        previous: &FaceEstimate,
        use_tracking: bool,
    ) -> FaceEstimate {
        if use_tracking {
            self.region_tracking(image, previous)
        } else {
            self.full_detection(image)
        }
    }

    pub fn full_detection(&mut self, image: &GrayImage) -> FaceEstimate {
        let (img_w, img_h) = image.dimensions();
        if img_w == 0 || img_h == 0 {
            return FaceEstimate::default();
        }

        let bounds = SizeBounds::at_least(self.min_face_size, self.min_face_size);
        let candidates = self.candidates(image, bounds);

        let Some(face) = largest(&candidates) else {
            log::debug!("Full scan found no face");
            return FaceEstimate::default();
        };

        log::debug!("Full scan picked {face:?} of {} candidates", candidates.len());
        self.build_estimate(image, face, FULL_DETECTION_CONFIDENCE)
    }

    pub fn region_tracking(&mut self, image: &GrayImage, previous: &FaceEstimate) -> FaceEstimate {
        let (img_w, img_h) = image.dimensions();
        if img_w == 0 || img_h == 0 {
            return FaceEstimate::default();
        }
        let (w, h) = (img_w as f64, img_h as f64);

        let prev_x = (previous.center_x * w - previous.width * w / 2.0) as i32;
        let prev_y = (previous.center_y * h - previous.height * h / 2.0) as i32;
        let prev_w = (previous.width * w) as i32;
        let prev_h = (previous.height * h) as i32;

        let search = search_region(prev_x, prev_y, prev_w, prev_h, img_w, img_h);
        if search.is_degenerate() || search.x >= img_w as i32 || search.y >= img_h as i32 {
            log::debug!("Degenerate search region {search:?}, falling back to full scan");
            return self.full_detection(image);
        }

        let area = imageops::crop_imm(
            image,
            search.x as u32,
            search.y as u32,
            search.width as u32,
            search.height as u32,
        )
        .to_image();

        let bounds = SizeBounds::between(
            ((prev_w / 2).max(0) as u32, (prev_h / 2).max(0) as u32),
            (
                prev_w.saturating_mul(2).max(0) as u32,
                prev_h.saturating_mul(2).max(0) as u32,
            ),
        );
        let candidates: Vec<PixelRect> = self
            .candidates(&area, bounds)
            .into_iter()
            .map(|r| r.offset(search.x, search.y))
            .collect();

        let prev_center = (previous.center_x * w, previous.center_y * h);
        let Some(face) = closest(&candidates, prev_center) else {
            log::debug!("Lost face in {search:?}, falling back to full scan");
            return self.full_detection(image);
        };

        self.build_estimate(image, face, REGION_TRACKING_CONFIDENCE)
    }

    /// Detector candidates clipped to `image`, with degenerate ones dropped.
    /// A failed pass counts as no candidates.
    fn candidates(&mut self, image: &GrayImage, bounds: SizeBounds) -> Vec<PixelRect> {
        let (img_w, img_h) = image.dimensions();
        match self.detector.detect(image, bounds) {
            Ok(rects) => rects
                .into_iter()
                .map(|r| r.clamp_to(img_w, img_h))
                .filter(|r| !r.is_degenerate())
                .collect(),
            Err(e) => {
                log::warn!("Face detector failed, treating as no candidates: {e}");
                Vec::new()
            }
        }
    }

    /// Normalized estimate for `face` (full-image pixels), with landmarks
    /// from the cropped face region.
    fn build_estimate(&mut self, image: &GrayImage, face: PixelRect, confidence: f64) -> FaceEstimate {
        let (w, h) = (image.width() as f64, image.height() as f64);
        let (cx, cy) = face.center();

        let face_roi = imageops::crop_imm(
            image,
            face.x as u32,
            face.y as u32,
            face.width as u32,
            face.height as u32,
        )
        .to_image();

        let landmarks: Vec<(f64, f64)> = self
            .landmarks
            .landmarks(&face_roi)
            .into_iter()
            .map(|(lx, ly)| ((lx + face.x as f64) / w, (ly + face.y as f64) / h))
            .collect();

        FaceEstimate {
            center_x: cx / w,
            center_y: cy / h,
            width: face.width as f64 / w,
            height: face.height as f64 / h,
            rotation: landmark_estimator::rotation(&landmarks),
            confidence,
            landmarks,
        }
    }
}

/// Previous face box grown by a margin of half its width on each side,
/// clipped to the image.
fn search_region(
    prev_x: i32,
    prev_y: i32,
    prev_w: i32,
    prev_h: i32,
    img_w: u32,
    img_h: u32,
) -> PixelRect {
    let margin = (prev_w as f64 * SEARCH_MARGIN_RATIO) as i32;
    let grow = margin.saturating_mul(2);
    let x = prev_x.saturating_sub(margin).max(0);
    let y = prev_y.saturating_sub(margin).max(0);
    let width = (img_w as i32).saturating_sub(x).min(prev_w.saturating_add(grow));
    let height = (img_h as i32).saturating_sub(y).min(prev_h.saturating_add(grow));
    PixelRect::new(x, y, width, height)
}

/// Largest by area; the first emitted wins ties.
fn largest(candidates: &[PixelRect]) -> Option<PixelRect> {
    let mut best: Option<PixelRect> = None;
    for &c in candidates {
        if best.map_or(true, |b| c.area() > b.area()) {
            best = Some(c);
        }
    }
    best
}

/// Center closest to `target`; the first emitted wins ties.
fn closest(candidates: &[PixelRect], target: (f64, f64)) -> Option<PixelRect> {
    let mut best: Option<(PixelRect, f64)> = None;
    for &c in candidates {
        let dist = c.center_distance(target);
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((c, dist));
        }
    }
    best.map(|(c, _)| c)
}
