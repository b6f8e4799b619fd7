pub mod bounding_box;
pub mod clock;
pub mod constants;
pub mod frame;
pub mod model_resolver;
#[cfg(feature = "onnx")]
pub mod onnx_session;
pub mod session_config;
