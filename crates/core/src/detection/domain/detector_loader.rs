use thiserror::Error;

use crate::detection::domain::candidate_detector::{CandidateDetector, DetectError};
use crate::shared::model_resolver::ModelResolveError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Resolve(#[from] ModelResolveError),
    #[error(transparent)]
    Detector(#[from] DetectError),
}

/// Supplies the detectors a tracker runs on.
///
/// The primary (face) detector is required. The secondary (ocular
/// landmark) detector is optional: without it rotation is never estimated.
pub trait DetectorLoader: Send + Sync {
    fn load_primary(&self) -> Result<Box<dyn CandidateDetector>, LoadError>;
    fn load_secondary(&self) -> Result<Option<Box<dyn CandidateDetector>>, LoadError>;
}
