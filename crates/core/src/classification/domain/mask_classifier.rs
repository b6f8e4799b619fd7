use thiserror::Error;

use crate::classification::domain::face_region::FaceRegion;
use crate::classification::domain::verdict::Verdict;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    /// The classifier could not produce a result for this region.
    #[error("classification unavailable: {0}")]
    Unavailable(String),
}

/// Domain interface for the mask classifier backend.
///
/// Any backend (model inference, heuristic, test stub) is interchangeable.
/// Confidence should lie in `[0, 1]`; the pipeline clamps before storing.
/// Input pixels are RGB `u8`; normalization is up to the implementation.
pub trait MaskClassifier: Send {
    fn classify(&mut self, region: &FaceRegion) -> Result<Verdict, ClassificationError>;

    /// Fixed `(width, height)` the region should be resized to, if any.
    fn input_size(&self) -> Option<(u32, u32)> {
        None
    }
}
