use serde::{Deserialize, Serialize};

/// Axis-aligned face box in frame pixel coordinates.
///
/// Locators may report boxes that extend past the frame edges; use
/// [`BoundingBox::clamp_to`] before reading pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(0),
            height: height.max(0),
        }
    }

    /// Builds a box from float corner coordinates, rounding to pixels.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let left = x1.min(x2).round() as i32;
        let top = y1.min(y2).round() as i32;
        let right = x1.max(x2).round() as i32;
        let bottom = y1.max(y2).round() as i32;
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Intersects the box with `[0, frame_width] x [0, frame_height]`.
    ///
    /// Returns `None` when nothing of positive area remains.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let fw = frame_width.min(i32::MAX as u32) as i32;
        let fh = frame_height.min(i32::MAX as u32) as i32;

        let x1 = self.x.clamp(0, fw);
        let y1 = self.y.clamp(0, fh);
        let x2 = self.x.saturating_add(self.width).clamp(0, fw);
        let y2 = self.y.saturating_add(self.height).clamp(0, fh);

        if x2 - x1 <= 0 || y2 - y1 <= 0 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        inter / (self.area() as f64 + other.area() as f64 - inter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── Clamping ─────────────────────────────────────────────────────

    #[test]
    fn test_clamp_inside_frame_is_identity() {
        let b = BoundingBox::new(10, 10, 100, 100);
        assert_eq!(b.clamp_to(640, 480), Some(b));
    }

    #[test]
    fn test_clamp_left_overhang() {
        let b = BoundingBox::new(-50, 0, 60, 60);
        assert_eq!(b.clamp_to(640, 480), Some(BoundingBox::new(0, 0, 10, 60)));
    }

    #[test]
    fn test_clamp_bottom_right_overhang() {
        let b = BoundingBox::new(600, 450, 100, 100);
        assert_eq!(b.clamp_to(640, 480), Some(BoundingBox::new(600, 450, 40, 30)));
    }

    #[rstest]
    #[case::left_of_frame(BoundingBox::new(-100, 10, 50, 50))]
    #[case::above_frame(BoundingBox::new(10, -100, 50, 50))]
    #[case::right_of_frame(BoundingBox::new(700, 10, 50, 50))]
    #[case::below_frame(BoundingBox::new(10, 500, 50, 50))]
    #[case::touching_right_edge(BoundingBox::new(640, 10, 50, 50))]
    #[case::zero_width(BoundingBox::new(10, 10, 0, 50))]
    #[case::zero_height(BoundingBox::new(10, 10, 50, 0))]
    fn test_clamp_empty(#[case] b: BoundingBox) {
        assert_eq!(b.clamp_to(640, 480), None);
    }

    #[test]
    fn test_clamp_box_larger_than_frame() {
        let b = BoundingBox::new(-10, -10, 1000, 1000);
        assert_eq!(b.clamp_to(64, 48), Some(BoundingBox::new(0, 0, 64, 48)));
    }

    // ── Construction ─────────────────────────────────────────────────

    #[test]
    fn test_negative_size_is_floored_to_zero() {
        let b = BoundingBox::new(5, 5, -3, -4);
        assert_eq!(b.width, 0);
        assert_eq!(b.height, 0);
        assert_eq!(b.area(), 0);
    }

    #[test]
    fn test_from_corners_rounds_and_orders() {
        let b = BoundingBox::from_corners(110.6, 20.4, 10.2, 80.5);
        assert_eq!(b, BoundingBox::new(10, 20, 101, 61));
    }

    // ── IoU ──────────────────────────────────────────────────────────

    #[test]
    fn test_iou_identical() {
        let a = BoundingBox::new(10, 10, 100, 100);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection 50*100 = 5000, union 15000
        let a = BoundingBox::new(0, 0, 100, 100);
        let b = BoundingBox::new(50, 0, 100, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_touching_edges() {
        let a = BoundingBox::new(0, 0, 50, 50);
        let b = BoundingBox::new(50, 0, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }
}
