use crate::detection::domain::estimate_smoother::{clamp_unit, EstimateSmoother, ExponentialSmoother};
use crate::detection::domain::face_estimate::FaceEstimate;

/// Per-session tracking state: the last published estimate and the
/// hysteresis flag that decides whether the next frame may track.
pub struct TrackerState {
    previous: FaceEstimate,
    has_previous: bool,
    tracking_enabled: bool,
    detection_confidence: f64,
    smoother: ExponentialSmoother,
}

impl TrackerState {
    pub fn new(tracking_enabled: bool, detection_confidence: f64, smooth_factor: f64) -> Self {
        Self {
            previous: FaceEstimate::default(),
            has_previous: false,
            tracking_enabled,
            detection_confidence: clamp_unit(detection_confidence),
            smoother: ExponentialSmoother::new(smooth_factor),
        }
    }

    pub fn previous(&self) -> &FaceEstimate {
        &self.previous
    }

    pub fn has_previous(&self) -> bool {
        self.has_previous
    }

    /// Whether the next frame should search around the previous face.
    pub fn use_tracking(&self) -> bool {
        self.has_previous && self.tracking_enabled
    }

    /// Fold a raw estimate into the state and return the smoothed one.
    ///
    /// Smoothing always runs against the stored estimate, so the first
    /// frame is pulled toward the frame center.
    pub fn advance(&mut self, raw: FaceEstimate) -> FaceEstimate {
        let raw_confidence = raw.confidence;
        let smoothed = self.smoother.smooth(&self.previous, raw);
        self.previous = smoothed.clone();
        self.has_previous = raw_confidence > self.detection_confidence;
        smoothed
    }

    /// Forget the previous face; the next frame runs a full scan.
    pub fn reset(&mut self) {
        self.previous = FaceEstimate::default();
        self.has_previous = false;
    }

    pub fn tracking_enabled(&self) -> bool {
        self.tracking_enabled
    }

    pub fn set_tracking_enabled(&mut self, enabled: bool) {
        self.tracking_enabled = enabled;
    }

    pub fn detection_confidence(&self) -> f64 {
        self.detection_confidence
    }

    pub fn set_detection_confidence(&mut self, value: f64) {
        self.detection_confidence = clamp_unit(value);
    }

    pub fn smooth_factor(&self) -> f64 {
        self.smoother.alpha()
    }

    pub fn set_smooth_factor(&mut self, value: f64) {
        self.smoother.set_alpha(value);
    }
}
