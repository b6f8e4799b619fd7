#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_frame_source;
pub mod image_sequence_source;
