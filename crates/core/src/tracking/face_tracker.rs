use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use thiserror::Error;

use crate::detection::domain::candidate_detector::DetectError;
use crate::detection::domain::detector_loader::{DetectorLoader, LoadError};
use crate::detection::domain::face_estimate::{FaceEstimate, FaceSignal};
use crate::detection::domain::face_locator::FaceLocator;
use crate::detection::domain::landmark_estimator::LandmarkEstimator;
use crate::preprocessing::frame_preprocessor::to_equalized_gray;
use crate::shared::frame::Frame;
use crate::shared::model_resolver::ModelResolveError;
use crate::tracking::tracker_config::TrackerConfig;
use crate::tracking::tracker_state::TrackerState;
use crate::tracking::tracking_logger::{NullTrackingLogger, TrackingLogger};

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("face model unavailable: {0}")]
    ModelUnavailable(#[source] ModelResolveError),
    #[error("face detector failed to load: {0}")]
    DetectorLoad(#[source] DetectError),
}

impl From<LoadError> for TrackerError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::Resolve(e) => TrackerError::ModelUnavailable(e),
            LoadError::Detector(e) => TrackerError::DetectorLoad(e),
        }
    }
}

/// Thread-safe face tracking session.
///
/// `estimate` calls are serialized on the engine lock so each frame's
/// read-modify-write of the tracking state is atomic. The state lock is
/// only held around that read and write, so [`latest`](Self::latest),
/// [`signal`](Self::signal) and the setters never wait on detection.
pub struct FaceTracker {
    loader: Box<dyn DetectorLoader>,
    min_face_size: u32,
    landmark_min_size: u32,
    engine: Mutex<Option<FaceLocator>>,
    state: Mutex<TrackerState>,
    initialized: AtomicBool,
}

impl FaceTracker {
    pub fn new(config: &TrackerConfig, loader: Box<dyn DetectorLoader>) -> Self {
        let config = config.clone().sanitized();
        Self {
            loader,
            min_face_size: config.min_face_size,
            landmark_min_size: config.landmark_min_size,
            engine: Mutex::new(None),
            state: Mutex::new(TrackerState::new(
                config.tracking_enabled,
                config.detection_confidence,
                config.smooth_factor,
            )),
            initialized: AtomicBool::new(false),
        }
    }

    /// Load the detectors. Calling again once initialized is a no-op.
    ///
    /// A missing primary detector fails; a missing landmark detector only
    /// disables rotation.
    pub fn initialize(&self) -> Result<(), TrackerError> {
        let mut engine = lock(&self.engine);
        if engine.is_some() {
            return Ok(());
        }

        let detector = self.loader.load_primary().map_err(|e| {
            let err = TrackerError::from(e);
            log::error!("Face tracker not initialized: {err}");
            err
        })?;

        let secondary = match self.loader.load_secondary() {
            Ok(Some(detector)) => Some(detector),
            Ok(None) => {
                log::warn!("No landmark model configured, rotation disabled");
                None
            }
            Err(e) => {
                log::warn!("Landmark model unavailable, rotation disabled: {e}");
                None
            }
        };
        let landmarks = LandmarkEstimator::new(secondary, self.landmark_min_size);

        *engine = Some(FaceLocator::new(detector, landmarks, self.min_face_size));
        lock(&self.state).reset();
        self.initialized.store(true, Ordering::Release);
        log::info!("Face tracker initialized");
        Ok(())
    }

    /// Drop the detectors and forget the previous face. Idempotent.
    pub fn shutdown(&self) {
        let mut engine = lock(&self.engine);
        if engine.take().is_some() {
            log::info!("Face tracker shut down");
        }
        lock(&self.state).reset();
        self.initialized.store(false, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Process one frame and return the published (smoothed) estimate.
    ///
    /// Uninitialized trackers and empty or malformed frames yield the
    /// default estimate and leave the state untouched.
    pub fn estimate(&self, frame: &Frame) -> FaceEstimate {
        self.estimate_logged(frame, &mut NullTrackingLogger)
    }

    /// [`estimate`](Self::estimate), reporting stage timings to `logger`.
    pub fn estimate_logged(&self, frame: &Frame, logger: &mut dyn TrackingLogger) -> FaceEstimate {
        let mut engine = lock(&self.engine);
        let Some(locator) = engine.as_mut() else {
            return FaceEstimate::default();
        };

        let started = Instant::now();
        let Some(gray) = to_equalized_gray(frame) else {
            log::debug!("Frame {} is empty or malformed, skipping", frame.index());
            return FaceEstimate::default();
        };
        logger.timing("preprocess", elapsed_ms(started));

        let (previous, use_tracking) = {
            let state = lock(&self.state);
            (state.previous().clone(), state.use_tracking())
        };

        let started = Instant::now();
        let raw = locator.estimate(&gray, &previous, use_tracking);
        logger.timing("detect", elapsed_ms(started));

        let published = lock(&self.state).advance(raw);
        logger.frame(&published);
        published
    }

    pub fn set_detection_confidence(&self, value: f64) {
        lock(&self.state).set_detection_confidence(value);
    }

    pub fn set_smooth_factor(&self, value: f64) {
        lock(&self.state).set_smooth_factor(value);
    }

    pub fn set_tracking_mode(&self, enabled: bool) {
        lock(&self.state).set_tracking_enabled(enabled);
    }

    pub fn detection_confidence(&self) -> f64 {
        lock(&self.state).detection_confidence()
    }

    pub fn smooth_factor(&self) -> f64 {
        lock(&self.state).smooth_factor()
    }

    pub fn tracking_mode(&self) -> bool {
        lock(&self.state).tracking_enabled()
    }

    /// The most recently published estimate.
    pub fn latest(&self) -> FaceEstimate {
        lock(&self.state).previous().clone()
    }

    pub fn signal(&self) -> FaceSignal {
        FaceSignal::from(&self.latest())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
