use serde::Serialize;

use crate::shared::constants::DETECTED_THRESHOLD;

/// One frame's face signal, normalized to image width/height.
///
/// The "no face" value has the same shape as a real detection; consumers
/// branch only on `confidence`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceEstimate {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// In-plane roll in radians, 0 when undeterminable.
    pub rotation: f64,
    /// Fixed tag of the detection path that produced this estimate.
    pub confidence: f64,
    /// Normalized points in detector emission order.
    pub landmarks: Vec<(f64, f64)>,
}

impl FaceEstimate {
    pub const NO_FACE: FaceEstimate = FaceEstimate {
        center_x: 0.5,
        center_y: 0.5,
        width: 0.0,
        height: 0.0,
        rotation: 0.0,
        confidence: 0.0,
        landmarks: Vec::new(),
    };

    pub fn is_detected(&self) -> bool {
        self.confidence > DETECTED_THRESHOLD
    }
}

impl Default for FaceEstimate {
    fn default() -> Self {
        Self::NO_FACE
    }
}

/// What the render stage reads once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FaceSignal {
    pub center: (f64, f64),
    pub size: (f64, f64),
    pub rotation: f64,
    pub confidence: f64,
    pub detected: bool,
}

impl From<&FaceEstimate> for FaceSignal {
    fn from(estimate: &FaceEstimate) -> Self {
        Self {
            center: (estimate.center_x, estimate.center_y),
            size: (estimate.width, estimate.height),
            rotation: estimate.rotation,
            confidence: estimate.confidence,
            detected: estimate.is_detected(),
        }
    }
}
