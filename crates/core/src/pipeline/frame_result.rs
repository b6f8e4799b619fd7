use serde::Serialize;

use crate::classification::domain::verdict::Verdict;
use crate::shared::bounding_box::BoundingBox;

/// Whether a verdict came from the classifier this frame or from the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    Fresh,
    Cached,
}

/// One accepted face in a frame result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceVerdict {
    pub bbox: BoundingBox,
    pub has_mask: bool,
    pub confidence: f64,
    pub source: VerdictSource,
}

impl FaceVerdict {
    pub fn new(bbox: BoundingBox, verdict: Verdict, source: VerdictSource) -> Self {
        Self {
            bbox,
            has_mask: verdict.has_mask,
            confidence: verdict.confidence,
            source,
        }
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::new(self.has_mask, self.confidence)
    }
}

/// Everything the presentation layer gets for one processed frame.
///
/// `face_count` is the number of boxes the locator reported; boxes skipped
/// for an empty region or an unavailable classification are missing from
/// `faces`, so `face_count - faces.len()` of them were dropped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameResult {
    pub frame_index: usize,
    pub faces: Vec<FaceVerdict>,
    pub face_count: usize,
    pub with_mask_count: usize,
    pub without_mask_count: usize,
    pub fps: u32,
    pub average_latency_ms: f64,
}

impl FrameResult {
    pub fn new(frame_index: usize, face_count: usize, faces: Vec<FaceVerdict>) -> Self {
        let with_mask_count = faces.iter().filter(|f| f.has_mask).count();
        let without_mask_count = faces.len() - with_mask_count;
        Self {
            frame_index,
            faces,
            face_count,
            with_mask_count,
            without_mask_count,
            fps: 0,
            average_latency_ms: 0.0,
        }
    }

    pub fn empty(frame_index: usize) -> Self {
        Self::new(frame_index, 0, Vec::new())
    }

    pub fn skipped(&self) -> usize {
        self.face_count.saturating_sub(self.faces.len())
    }
}
