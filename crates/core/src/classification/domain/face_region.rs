use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Pixels of one face, cut from a frame and ready for classification.
#[derive(Clone, Debug)]
pub struct FaceRegion {
    pixels: Frame,
    bounds: BoundingBox,
}

impl FaceRegion {
    pub fn new(pixels: Frame, bounds: BoundingBox) -> Self {
        Self { pixels, bounds }
    }

    /// Crop pixels, possibly resized to the classifier's input size.
    pub fn pixels(&self) -> &Frame {
        &self.pixels
    }

    /// Clamped source rectangle in frame coordinates.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}
