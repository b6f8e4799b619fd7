#[cfg(feature = "onnx")]
pub mod onnx_yolo_locator;
pub mod replay_face_locator;
