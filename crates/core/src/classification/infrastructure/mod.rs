#[cfg(feature = "onnx")]
pub mod onnx_mask_classifier;
pub mod skin_tone_mask_classifier;
