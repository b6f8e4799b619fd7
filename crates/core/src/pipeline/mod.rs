pub mod detection_session;
pub mod frame_result;
pub mod frame_scheduler;
pub mod pipeline_logger;
pub mod session_metrics;
