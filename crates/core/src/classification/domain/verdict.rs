use serde::{Deserialize, Serialize};

/// Mask / no-mask decision for one face with its confidence score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub has_mask: bool,
    pub confidence: f64,
}

impl Verdict {
    pub fn new(has_mask: bool, confidence: f64) -> Self {
        Self {
            has_mask,
            confidence,
        }
    }

    /// Clamps the confidence into `[min, max]`.
    ///
    /// Returns `None` when the score is NaN or infinite.
    pub fn clamped(self, min: f64, max: f64) -> Option<Verdict> {
        if !self.confidence.is_finite() {
            return None;
        }
        Some(Verdict {
            confidence: self.confidence.clamp(min, max),
            ..self
        })
    }

    pub fn label(&self) -> &'static str {
        if self.has_mask {
            "with_mask"
        } else {
            "without_mask"
        }
    }
}
