//! Depth camera interface for real-time frame ingestion

use crate::ingest::DepthFrame;

/// A source of posed depth frames.
///
/// The engine only pulls frames and, when asked, checks depth support and
/// toggles autofocus. It never changes any other camera state.
pub trait DepthCamera {
    /// Get the next frame from the camera.
    /// Returns None when the stream ends
    fn next_frame(&mut self) -> Result<Option<DepthFrame>, StreamError>;

    /// Get the frame rate (frames per second), if known
    fn frame_rate(&self) -> Option<f32>;

    /// Check if the stream is still active
    fn is_active(&self) -> bool;

    /// Whether the camera can produce automatic depth images.
    fn supports_depth(&self) -> bool;

    /// Enable or disable autofocus.
    fn set_autofocus(&mut self, enabled: bool) -> Result<(), StreamError>;
}

/// Errors that can occur during stream processing
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decoding error: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("Stream ended unexpectedly")]
    StreamEnded,
    #[error("Invalid frame data: {0}")]
    InvalidData(String),
    #[error("Camera rejected the request: {0}")]
    Unsupported(String),
}
