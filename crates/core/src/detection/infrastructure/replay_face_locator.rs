use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Replays pre-computed face boxes by frame index.
///
/// Lets a recorded detection pass drive the pipeline without a detector
/// model. Frames with no entry yield zero boxes.
pub struct ReplayFaceLocator {
    boxes: HashMap<usize, Vec<BoundingBox>>,
}

impl ReplayFaceLocator {
    pub fn new(boxes: HashMap<usize, Vec<BoundingBox>>) -> Self {
        Self { boxes }
    }

    /// Loads `{ "<frame_index>": [{"x":..,"y":..,"width":..,"height":..}, ..] }`.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read detections {}: {e}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let raw: HashMap<String, Vec<BoundingBox>> = serde_json::from_str(json)?;
        let mut boxes = HashMap::with_capacity(raw.len());
        for (key, frame_boxes) in raw {
            let index: usize = key
                .trim()
                .parse()
                .map_err(|_| format!("Invalid frame index in detections: {key:?}"))?;
            boxes.insert(index, frame_boxes);
        }
        Ok(Self::new(boxes))
    }

    pub fn frame_count(&self) -> usize {
        self.boxes.len()
    }
}

impl FaceLocator for ReplayFaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        Ok(self.boxes.get(&frame.index()).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, index)
    }

    #[test]
    fn test_returns_boxes_for_known_frame() {
        let boxes = vec![BoundingBox::new(10, 20, 50, 50), BoundingBox::new(60, 20, 30, 30)];
        let mut locator = ReplayFaceLocator::new(HashMap::from([(0, boxes.clone())]));

        assert_eq!(locator.locate(&frame(0)).unwrap(), boxes);
    }

    #[test]
    fn test_returns_empty_for_unknown_frame() {
        let mut locator =
            ReplayFaceLocator::new(HashMap::from([(0, vec![BoundingBox::new(1, 1, 5, 5)])]));

        assert!(locator.locate(&frame(5)).unwrap().is_empty());
    }

    #[test]
    fn test_from_json_parses_frame_indices() {
        let json = r#"{
            "0": [{ "x": 10, "y": 10, "width": 100, "height": 100 }],
            "2": [],
            "3": [{ "x": -50, "y": 0, "width": 60, "height": 60 },
                  { "x": 200, "y": 40, "width": 80, "height": 90 }]
        }"#;
        let mut locator = ReplayFaceLocator::from_json(json).unwrap();

        assert_eq!(locator.frame_count(), 3);
        assert_eq!(
            locator.locate(&frame(0)).unwrap(),
            vec![BoundingBox::new(10, 10, 100, 100)]
        );
        assert!(locator.locate(&frame(1)).unwrap().is_empty());
        assert!(locator.locate(&frame(2)).unwrap().is_empty());
        assert_eq!(locator.locate(&frame(3)).unwrap().len(), 2);
    }

    #[test]
    fn test_from_json_rejects_non_numeric_key() {
        let json = r#"{ "first": [] }"#;
        assert!(ReplayFaceLocator::from_json(json).is_err());
    }

    #[test]
    fn test_from_json_file_missing_is_error() {
        assert!(ReplayFaceLocator::from_json_file(Path::new("/nonexistent/boxes.json")).is_err());
    }

    #[test]
    fn test_from_json_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxes.json");
        fs::write(&path, r#"{ "1": [{ "x": 1, "y": 2, "width": 3, "height": 4 }] }"#).unwrap();

        let mut locator = ReplayFaceLocator::from_json_file(&path).unwrap();

        assert_eq!(
            locator.locate(&frame(1)).unwrap(),
            vec![BoundingBox::new(1, 2, 3, 4)]
        );
    }
}
