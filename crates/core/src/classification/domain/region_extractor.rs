use crate::classification::domain::face_region::FaceRegion;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Cuts face regions out of frames for the classifier.
///
/// Pure: the same frame and box always produce the same region.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegionExtractor {
    target_size: Option<(u32, u32)>,
}

impl RegionExtractor {
    /// `target_size` resizes every region to a fixed `(width, height)`;
    /// `None` keeps the clamped crop size.
    pub fn new(target_size: Option<(u32, u32)>) -> Self {
        Self { target_size }
    }

    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.target_size
    }

    /// Returns `None` when the box clamps to zero area inside the frame.
    pub fn extract(&self, frame: &Frame, bbox: &BoundingBox) -> Option<FaceRegion> {
        let bounds = bbox.clamp_to(frame.width(), frame.height())?;
        let crop = frame.crop(&bounds);
        let pixels = match self.target_size {
            Some((w, h)) => crop.resize(w, h)?,
            None => crop,
        };
        Some(FaceRegion::new(pixels, bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![100u8; (w * h * 3) as usize], w, h, 3, 0)
    }

    #[test]
    fn test_box_inside_frame_keeps_dimensions() {
        let extractor = RegionExtractor::new(None);
        let bbox = BoundingBox::new(10, 10, 100, 100);

        let region = extractor.extract(&frame(640, 480), &bbox).unwrap();

        assert_eq!(region.width(), 100);
        assert_eq!(region.height(), 100);
        assert_eq!(*region.bounds(), bbox);
    }

    #[test]
    fn test_box_partially_outside_is_clamped() {
        let extractor = RegionExtractor::new(None);
        let region = extractor
            .extract(&frame(640, 480), &BoundingBox::new(-50, 0, 60, 60))
            .unwrap();

        assert_eq!(*region.bounds(), BoundingBox::new(0, 0, 10, 60));
        assert_eq!(region.width(), 10);
        assert_eq!(region.height(), 60);
    }

    #[rstest]
    #[case::left(BoundingBox::new(-200, 10, 100, 100))]
    #[case::below(BoundingBox::new(10, 480, 100, 100))]
    #[case::zero_area(BoundingBox::new(10, 10, 0, 0))]
    fn test_box_outside_frame_is_empty(#[case] bbox: BoundingBox) {
        let extractor = RegionExtractor::new(None);
        assert!(extractor.extract(&frame(640, 480), &bbox).is_none());
    }

    #[test]
    fn test_resize_to_classifier_input() {
        let extractor = RegionExtractor::new(Some((224, 224)));
        let bbox = BoundingBox::new(600, 400, 100, 100);

        let region = extractor.extract(&frame(640, 480), &bbox).unwrap();

        assert_eq!(region.width(), 224);
        assert_eq!(region.height(), 224);
        assert_eq!(*region.bounds(), BoundingBox::new(600, 400, 40, 80));
    }

    #[test]
    fn test_extract_copies_source_pixels() {
        let mut data = vec![0u8; 4 * 4 * 3];
        // pixel (row=2, col=3) red
        data[(2 * 4 + 3) * 3] = 255;
        let frame = Frame::new(data, 4, 4, 3, 0);
        let extractor = RegionExtractor::default();

        let region = extractor
            .extract(&frame, &BoundingBox::new(2, 1, 5, 5))
            .unwrap();

        assert_eq!(*region.bounds(), BoundingBox::new(2, 1, 2, 3));
        assert_eq!(region.pixels().as_ndarray()[[1, 1, 0]], 255);
    }
}
