use crate::detection::domain::face_estimate::FaceEstimate;

/// Domain interface for temporal smoothing of face estimates.
pub trait EstimateSmoother: Send {
    fn smooth(&self, previous: &FaceEstimate, current: FaceEstimate) -> FaceEstimate;
}

/// EMA (Exponential Moving Average) smoother.
///
/// Formula: `ema[t] = alpha * current + (1 - alpha) * ema[t-1]`, applied to
/// center, size and rotation. Confidence and landmarks always come from
/// the current frame so gating reacts to the current detection path.
pub struct ExponentialSmoother {
    alpha: f64,
}

impl ExponentialSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: clamp_unit(alpha),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = clamp_unit(alpha);
    }

    fn blend(&self, prev: f64, current: f64) -> f64 {
        prev * (1.0 - self.alpha) + current * self.alpha
    }
}

impl EstimateSmoother for ExponentialSmoother {
    fn smooth(&self, previous: &FaceEstimate, current: FaceEstimate) -> FaceEstimate {
        FaceEstimate {
            center_x: self.blend(previous.center_x, current.center_x),
            center_y: self.blend(previous.center_y, current.center_y),
            width: self.blend(previous.width, current.width),
            height: self.blend(previous.height, current.height),
            rotation: self.blend(previous.rotation, current.rotation),
            confidence: current.confidence,
            landmarks: current.landmarks,
        }
    }
}

/// Clamp to `[0, 1]`; NaN maps to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn estimate(cx: f64, w: f64) -> FaceEstimate {
        FaceEstimate {
            center_x: cx,
            center_y: cx,
            width: w,
            height: w,
            rotation: 0.0,
            confidence: 0.8,
            landmarks: Vec::new(),
        }
    }

    #[test]
    fn test_half_alpha_is_midpoint() {
        let smoother = ExponentialSmoother::new(0.5);
        let result = smoother.smooth(&estimate(0.2, 0.1), estimate(0.8, 0.3));
        assert_eq!(result.center_x, 0.5);
        assert_eq!(result.width, 0.2);
    }

    #[test]
    fn test_applies_ema_to_every_geometric_field() {
        let smoother = ExponentialSmoother::new(0.3);
        let prev = FaceEstimate {
            center_x: 0.1,
            center_y: 0.2,
            width: 0.3,
            height: 0.4,
            rotation: 1.0,
            confidence: 0.85,
            landmarks: vec![(0.0, 0.0)],
        };
        let current = FaceEstimate {
            center_x: 0.5,
            center_y: 0.6,
            width: 0.7,
            height: 0.8,
            rotation: -1.0,
            confidence: 0.8,
            landmarks: vec![(0.4, 0.4), (0.6, 0.4)],
        };
        let result = smoother.smooth(&prev, current.clone());

        assert_relative_eq!(result.center_x, 0.7 * 0.1 + 0.3 * 0.5);
        assert_relative_eq!(result.center_y, 0.7 * 0.2 + 0.3 * 0.6);
        assert_relative_eq!(result.width, 0.7 * 0.3 + 0.3 * 0.7);
        assert_relative_eq!(result.height, 0.7 * 0.4 + 0.3 * 0.8);
        assert_relative_eq!(result.rotation, 0.7 * 1.0 + 0.3 * -1.0);
        assert_eq!(result.confidence, current.confidence);
        assert_eq!(result.landmarks, current.landmarks);
    }

    #[test]
    fn test_first_frame_pulls_toward_center() {
        let smoother = ExponentialSmoother::new(0.3);
        let result = smoother.smooth(&FaceEstimate::default(), estimate(0.9, 0.2));
        assert_relative_eq!(result.center_x, 0.7 * 0.5 + 0.3 * 0.9);
        assert_relative_eq!(result.width, 0.3 * 0.2);
    }

    #[test]
    fn test_convergence() {
        let smoother = ExponentialSmoother::new(0.3);
        let target = estimate(0.9, 0.25);
        let mut result = FaceEstimate::default();
        for _ in 0..100 {
            result = smoother.smooth(&result, target.clone());
        }
        assert_relative_eq!(result.center_x, 0.9, epsilon = 1e-6);
        assert_relative_eq!(result.width, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_alpha_zero_keeps_previous_geometry() {
        let smoother = ExponentialSmoother::new(0.0);
        let prev = estimate(0.2, 0.1);
        let result = smoother.smooth(&prev, estimate(0.9, 0.9));
        assert_eq!(result.center_x, prev.center_x);
        assert_eq!(result.width, prev.width);
    }

    #[test]
    fn test_alpha_one_uses_current() {
        let smoother = ExponentialSmoother::new(1.0);
        let current = estimate(0.9, 0.4);
        let result = smoother.smooth(&estimate(0.2, 0.1), current.clone());
        assert_eq!(result, current);
    }

    #[rstest]
    #[case::below(-0.5, 0.0)]
    #[case::above(3.0, 1.0)]
    #[case::nan(f64::NAN, 0.0)]
    #[case::inside(0.4, 0.4)]
    fn test_alpha_is_clamped(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(ExponentialSmoother::new(input).alpha(), expected);
    }
}
