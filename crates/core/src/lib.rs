//! Face mask detection pipeline with temporal verdict stabilization.
//!
//! Frames flow through a [`DetectionSession`]: faces are located, mapped to
//! spatial identities, classified once per identity and then served from a
//! stabilization cache until a frame with no faces.
//!
//! [`DetectionSession`]: pipeline::detection_session::DetectionSession

pub mod classification;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod video;
