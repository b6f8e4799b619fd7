/// Two-class mask classifier using ONNX Runtime via `ort`.
///
/// Expects a model with a single RGB image input (NHWC or NCHW, detected
/// from the declared input shape) scaled to `[0, 1]`, and a `[1, 2]` score
/// output ordered `[without_mask, with_mask]`.
use std::path::Path;

use crate::classification::domain::face_region::FaceRegion;
use crate::classification::domain::mask_classifier::{ClassificationError, MaskClassifier};
use crate::classification::domain::verdict::Verdict;
use crate::shared::constants::MASK_CLASSIFIER_INPUT_SIZE;
use crate::shared::onnx_session::{image_input_shape, load_session, InputLayout};

/// Output index of the `with_mask` score.
const WITH_MASK_INDEX: usize = 1;

pub struct OnnxMaskClassifier {
    session: ort::session::Session,
    layout: InputLayout,
}

impl OnnxMaskClassifier {
    /// Loads the model. A dynamic input shape falls back to 224x224 NHWC.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let layout = image_input_shape(&session).unwrap_or(InputLayout::Nhwc {
            height: MASK_CLASSIFIER_INPUT_SIZE,
            width: MASK_CLASSIFIER_INPUT_SIZE,
        });
        log::info!("Mask classifier input: {layout:?}");
        Ok(Self { session, layout })
    }

    fn infer(&mut self, region: &FaceRegion) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input = to_input_tensor(region, self.layout)?;
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("mask model produced no outputs".into());
        }
        let scores = outputs[0].try_extract_array::<f32>()?;
        Ok(scores.iter().copied().collect())
    }
}

impl MaskClassifier for OnnxMaskClassifier {
    fn classify(&mut self, region: &FaceRegion) -> Result<Verdict, ClassificationError> {
        let scores = self
            .infer(region)
            .map_err(|e| ClassificationError::Unavailable(e.to_string()))?;
        verdict_from_scores(&scores)
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        Some(self.layout.size())
    }
}

/// Packs an RGB region into a `[1, ...]` float tensor for `layout`.
///
/// The region must already be at the model's input size.
fn to_input_tensor(
    region: &FaceRegion,
    layout: InputLayout,
) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    let (width, height) = layout.size();
    let pixels = region.pixels();
    if pixels.channels() != 3 || pixels.width() != width || pixels.height() != height {
        return Err(format!(
            "region is {}x{}x{}, model expects {width}x{height}x3",
            pixels.width(),
            pixels.height(),
            pixels.channels()
        )
        .into());
    }

    let src = pixels.as_ndarray();
    let (h, w) = (height as usize, width as usize);
    let tensor = match layout {
        InputLayout::Nhwc { .. } => {
            ndarray::Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| {
                src[[y, x, c]] as f32 / 255.0
            })
        }
        InputLayout::Nchw { .. } => {
            ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
                src[[y, x, c]] as f32 / 255.0
            })
        }
    };
    Ok(tensor)
}

/// Argmax over `[without_mask, with_mask]`; the winning score is the confidence.
/// A tie goes to `with_mask`.
fn verdict_from_scores(scores: &[f32]) -> Result<Verdict, ClassificationError> {
    if scores.len() != 2 {
        return Err(ClassificationError::Unavailable(format!(
            "expected 2 class scores, got {}",
            scores.len()
        )));
    }
    let has_mask = scores[WITH_MASK_INDEX] >= scores[1 - WITH_MASK_INDEX];
    let confidence = if has_mask {
        scores[WITH_MASK_INDEX]
    } else {
        scores[1 - WITH_MASK_INDEX]
    };
    Ok(Verdict::new(has_mask, confidence as f64))
}
