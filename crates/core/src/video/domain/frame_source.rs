use crate::shared::frame::Frame;

/// Yields frames on demand, one per orchestration cycle.
///
/// Implementations handle I/O details (decoding, device access) while the
/// session works with the abstract [`Frame`] type. A source may be opened
/// again after [`FrameSource::close`] to restart from the beginning.
pub trait FrameSource: Send {
    /// Acquires the underlying resource.
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Returns the next frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
