use crate::shared::bounding_box::BoundingBox;

/// Spatial bucket of a box's top-left corner.
///
/// Recomputed every frame from position alone, so a face that crosses a
/// bucket boundary gets a new identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceIdentity {
    pub bucket_x: i32,
    pub bucket_y: i32,
}

/// Maps boxes to [`FaceIdentity`] by quantizing the top-left corner.
///
/// The bucket size is fixed at construction and cannot change for the
/// lifetime of a session.
#[derive(Clone, Copy, Debug)]
pub struct IdentityTracker {
    bucket_size: u32,
}

impl IdentityTracker {
    pub fn new(bucket_size: u32) -> Self {
        Self {
            bucket_size: bucket_size.max(1),
        }
    }

    pub fn bucket_size(&self) -> u32 {
        self.bucket_size
    }

    pub fn identity_for(&self, bbox: &BoundingBox) -> FaceIdentity {
        FaceIdentity {
            bucket_x: self.quantize(bbox.x),
            bucket_y: self.quantize(bbox.y),
        }
    }

    fn quantize(&self, coord: i32) -> i32 {
        (coord as f64 / self.bucket_size as f64).round() as i32
    }
}
