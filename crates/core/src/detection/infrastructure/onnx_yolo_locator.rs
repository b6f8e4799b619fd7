/// YOLO face locator on ONNX Runtime via `ort`.
///
/// Returns raw boxes in frame coordinates. No tracking is done here;
/// identity is derived downstream from box position alone.
use std::path::Path;

use ndarray::{s, Array4};

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{image_input_shape, load_session};

/// Used when the model declares a dynamic input shape.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.25;

const NMS_IOU_THRESH: f64 = 0.45;

/// YOLO letterbox padding value (114 gray).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloLocator {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let input_size = image_input_shape(&session)
            .map(|layout| layout.size().1)
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::info!("Face locator input size: {input_size}x{input_size}");

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceLocator for OnnxYoloLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        let letterbox = Letterbox::fit(frame.width(), frame.height(), self.input_size);
        let input = letterbox.tensor(frame)?;

        let outputs = self
            .session
            .run(ort::inputs![ort::value::Tensor::from_array(input)?])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("YOLO output is not contiguous")?;

        let mut candidates = decode_candidates(data, &shape, self.confidence, &letterbox)?;
        Ok(suppress_overlaps(&mut candidates, NMS_IOU_THRESH))
    }
}

/// Aspect-preserving fit of a frame into a square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    target: u32,
    scale: f64,
    scaled_w: u32,
    scaled_h: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(frame_w: u32, frame_h: u32, target: u32) -> Self {
        let scale = (target as f64 / frame_w as f64).min(target as f64 / frame_h as f64);
        let scaled_w = ((frame_w as f64 * scale).round() as u32).clamp(1, target);
        let scaled_h = ((frame_h as f64 * scale).round() as u32).clamp(1, target);
        Self {
            target,
            scale,
            scaled_w,
            scaled_h,
            pad_x: (target - scaled_w) / 2,
            pad_y: (target - scaled_h) / 2,
        }
    }

    /// NCHW float tensor in `[0, 1]`, gray outside the scaled image.
    fn tensor(&self, frame: &Frame) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
        let scaled = frame
            .resize(self.scaled_w, self.scaled_h)
            .ok_or("YOLO locator needs an RGB frame")?;
        let pixels = scaled.as_ndarray();

        let side = self.target as usize;
        let mut tensor = Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);
        let (x0, y0) = (self.pad_x as usize, self.pad_y as usize);
        let (w, h) = (self.scaled_w as usize, self.scaled_h as usize);
        for c in 0..3 {
            tensor
                .slice_mut(s![0, c, y0..y0 + h, x0..x0 + w])
                .assign(&pixels.slice(s![.., .., c]).mapv(|v| v as f32 / 255.0));
        }
        Ok(tensor)
    }

    /// Maps a model-space point back to frame pixels.
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    bbox: BoundingBox,
    score: f32,
}

/// Reads `[cx, cy, w, h, conf, ...]` rows from a `[1, F, N]` or `[1, N, F]`
/// output, keeping rows at or above `min_confidence`.
fn decode_candidates(
    data: &[f32],
    shape: &[usize],
    min_confidence: f64,
    letterbox: &Letterbox,
) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
    let &[_, d1, d2] = shape else {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    };
    // Far more anchors than features per anchor
    let features_first = d1 < d2;
    let (count, features) = if features_first { (d2, d1) } else { (d1, d2) };
    if features < 5 {
        return Err(format!("YOLO output has {features} features per row, need 5").into());
    }
    let at = |row: usize, feature: usize| -> f64 {
        let index = if features_first {
            feature * count + row
        } else {
            row * features + feature
        };
        data[index] as f64
    };

    let mut candidates = Vec::new();
    for row in 0..count {
        let score = at(row, 4);
        if score < min_confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(row, 0), at(row, 1), at(row, 2), at(row, 3));
        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);
        candidates.push(Candidate {
            bbox: BoundingBox::from_corners(x1, y1, x2, y2),
            score: score as f32,
        });
    }
    Ok(candidates)
}

/// Greedy NMS, highest score first.
fn suppress_overlaps(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<BoundingBox> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<BoundingBox> = Vec::new();
    for candidate in candidates.iter() {
        if kept.iter().all(|k| k.iou(&candidate.bbox) <= iou_thresh) {
            kept.push(candidate.bbox);
        }
    }
    kept
}
