use image::GrayImage;
use thiserror::Error;

use crate::shared::pixel_rect::PixelRect;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("failed to build inference session: {0}")]
    Session(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    Output(String),
}

/// Size constraints for candidate rectangles, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: (u32, u32),
    pub max: Option<(u32, u32)>,
}

impl SizeBounds {
    pub fn at_least(width: u32, height: u32) -> Self {
        Self {
            min: (width, height),
            max: None,
        }
    }

    pub fn between(min: (u32, u32), max: (u32, u32)) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn admits(&self, rect: &PixelRect) -> bool {
        let (w, h) = (rect.width.max(0) as u32, rect.height.max(0) as u32);
        let above_min = w >= self.min.0 && h >= self.min.1;
        let below_max = self.max.map_or(true, |(mw, mh)| w <= mw && h <= mh);
        above_min && below_max
    }
}

/// Domain interface for the candidate-rectangle detector primitive.
///
/// Given a grayscale image, returns axis-aligned candidates in the
/// detector's relevance order. Implementations may keep per-call scratch
/// state, hence `&mut self`.
pub trait CandidateDetector: Send {
    fn detect(
        &mut self,
        image: &GrayImage,
        bounds: SizeBounds,
    ) -> Result<Vec<PixelRect>, DetectError>;
}
