use ndarray::ArrayView3;

use crate::shared::bounding_box::BoundingBox;

/// A single video frame: contiguous RGB bytes in row-major order.
///
/// Frames are supplied once per orchestration cycle and are not retained
/// by the pipeline beyond that cycle.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels covered by `rect` into a new frame.
    ///
    /// `rect` must already lie inside the frame; see [`BoundingBox::clamp_to`].
    pub fn crop(&self, rect: &BoundingBox) -> Frame {
        let x1 = rect.x.max(0) as usize;
        let y1 = rect.y.max(0) as usize;
        let x2 = ((rect.x + rect.width) as usize).min(self.width as usize);
        let y2 = ((rect.y + rect.height) as usize).min(self.height as usize);

        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;
        let crop_w = x2.saturating_sub(x1);
        let crop_h = y2.saturating_sub(y1);

        let mut data = Vec::with_capacity(crop_w * crop_h * channels);
        for row in y1..y2 {
            let start = row * row_len + x1 * channels;
            data.extend_from_slice(&self.data[start..start + crop_w * channels]);
        }

        Frame::new(data, crop_w as u32, crop_h as u32, self.channels, self.index)
    }

    /// Resamples an RGB frame to `width` x `height` with a triangle filter.
    ///
    /// Returns `None` for non-RGB frames or empty targets.
    pub fn resize(&self, width: u32, height: u32) -> Option<Frame> {
        if self.channels != 3 || width == 0 || height == 0 {
            return None;
        }
        if self.width == width && self.height == height {
            return Some(self.clone());
        }
        let img = image::RgbImage::from_raw(self.width, self.height, self.data.clone())?;
        let resized =
            image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
        Some(Frame::new(
            resized.into_raw(),
            width,
            height,
            3,
            self.index,
        ))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for row in 0..h {
            for col in 0..w {
                data.extend_from_slice(&[col as u8, row as u8, 0]);
            }
        }
        Frame::new(data, w, h, 3, 0)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        let frame = gradient_frame(4, 3);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[3, 4, 3]); // (height, width, channels)
        assert_eq!(arr[[2, 1, 0]], 1);
        assert_eq!(arr[[2, 1, 1]], 2);
    }

    #[test]
    fn test_crop_copies_requested_window() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&BoundingBox::new(3, 2, 4, 5));

        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 5);
        let arr = crop.as_ndarray();
        assert_eq!(arr[[0, 0, 0]], 3); // col
        assert_eq!(arr[[0, 0, 1]], 2); // row
        assert_eq!(arr[[4, 3, 0]], 6);
        assert_eq!(arr[[4, 3, 1]], 6);
    }

    #[test]
    fn test_crop_keeps_frame_index() {
        let frame = Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, 17);
        let crop = frame.crop(&BoundingBox::new(0, 0, 2, 2));
        assert_eq!(crop.index(), 17);
    }

    #[test]
    fn test_resize_changes_dimensions() {
        let frame = gradient_frame(10, 20);
        let resized = frame.resize(224, 224).unwrap();
        assert_eq!(resized.width(), 224);
        assert_eq!(resized.height(), 224);
        assert_eq!(resized.data().len(), 224 * 224 * 3);
    }

    #[test]
    fn test_resize_uniform_frame_preserves_color() {
        let frame = Frame::new(vec![90u8; 6 * 6 * 3], 6, 6, 3, 0);
        let resized = frame.resize(3, 3).unwrap();
        assert!(resized.data().iter().all(|&v| v == 90));
    }

    #[test]
    fn test_resize_rejects_empty_target() {
        let frame = gradient_frame(4, 4);
        assert!(frame.resize(0, 4).is_none());
    }
}
