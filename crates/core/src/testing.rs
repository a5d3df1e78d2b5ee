//! Detector fakes shared by the unit tests.

use std::sync::{Arc, Mutex};

use image::GrayImage;

use crate::detection::domain::candidate_detector::{CandidateDetector, DetectError, SizeBounds};
use crate::detection::domain::detector_loader::{DetectorLoader, LoadError};
use crate::shared::pixel_rect::PixelRect;

#[derive(Clone, Debug)]
pub struct DetectCall {
    pub width: u32,
    pub height: u32,
    pub bounds: SizeBounds,
}

type Respond = Box<dyn FnMut(&GrayImage, SizeBounds) -> Result<Vec<PixelRect>, DetectError> + Send>;

/// Detector whose answers come from a closure, recording every call.
pub struct FnDetector {
    respond: Respond,
    calls: Arc<Mutex<Vec<DetectCall>>>,
}

impl FnDetector {
    pub fn new<F>(mut f: F) -> Self
    where
        F: FnMut(&GrayImage, SizeBounds) -> Vec<PixelRect> + Send + 'static,
    {
        Self {
            respond: Box::new(move |image, bounds| Ok(f(image, bounds))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            respond: Box::new(|_, _| Err(DetectError::Inference("boom".into()))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answers only for images of exactly `width` x `height`, empty otherwise.
    pub fn full_frame_only(width: u32, height: u32, rects: Vec<PixelRect>) -> Self {
        Self::new(move |image, _| {
            if image.dimensions() == (width, height) {
                rects.clone()
            } else {
                Vec::new()
            }
        })
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<DetectCall>>> {
        self.calls.clone()
    }
}

impl CandidateDetector for FnDetector {
    fn detect(
        &mut self,
        image: &GrayImage,
        bounds: SizeBounds,
    ) -> Result<Vec<PixelRect>, DetectError> {
        self.calls.lock().unwrap().push(DetectCall {
            width: image.width(),
            height: image.height(),
            bounds,
        });
        (self.respond)(image, bounds)
    }
}

type Loaded = Result<Option<Box<dyn CandidateDetector>>, LoadError>;
type Build = Box<dyn Fn() -> Loaded + Send + Sync>;

fn load_error(message: &'static str) -> Build {
    Box::new(move || -> Loaded { Err(LoadError::Detector(DetectError::Session(message.into()))) })
}

fn absent() -> Build {
    Box::new(|| -> Loaded { Ok(None) })
}

/// Loader whose detectors come from factory closures.
pub struct FnLoader {
    primary: Build,
    secondary: Build,
    primary_loads: Arc<Mutex<usize>>,
}

impl FnLoader {
    pub fn new<P>(primary: P) -> Self
    where
        P: Fn() -> Box<dyn CandidateDetector> + Send + Sync + 'static,
    {
        Self {
            primary: Box::new(move || -> Loaded { Ok(Some(primary())) }),
            secondary: absent(),
            primary_loads: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            primary: load_error("missing weights"),
            secondary: absent(),
            primary_loads: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_secondary<S>(mut self, secondary: S) -> Self
    where
        S: Fn() -> Box<dyn CandidateDetector> + Send + Sync + 'static,
    {
        self.secondary = Box::new(move || -> Loaded { Ok(Some(secondary())) });
        self
    }

    pub fn with_failing_secondary(mut self) -> Self {
        self.secondary = load_error("missing landmark weights");
        self
    }

    pub fn primary_loads(&self) -> Arc<Mutex<usize>> {
        self.primary_loads.clone()
    }
}

impl DetectorLoader for FnLoader {
    fn load_primary(&self) -> Result<Box<dyn CandidateDetector>, LoadError> {
        *self.primary_loads.lock().unwrap() += 1;
        (self.primary)()?.ok_or_else(|| DetectError::Session("no primary".into()).into())
    }

    fn load_secondary(&self) -> Loaded {
        (self.secondary)()
    }
}
