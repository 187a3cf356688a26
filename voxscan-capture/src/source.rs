//! Common capture error type.

use std::path::PathBuf;
use thiserror::Error;
use voxscan_recon::ingest::StreamError;

/// Errors that can occur while reading or writing a frame source.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Depth image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Frame {index}: depth image {} is empty", path.display())]
    EmptyDepth { index: usize, path: PathBuf },

    #[error("Frame {index}: depth image {} is {color:?}, expected 16-bit grayscale", path.display())]
    UnsupportedDepthFormat {
        index: usize,
        path: PathBuf,
        color: image::ColorType,
    },

    #[error("Invalid scene: {0}")]
    InvalidScene(String),
}

impl From<CaptureError> for StreamError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::Io(e) => StreamError::Io(e),
            CaptureError::Image(e) => StreamError::ImageDecode(e),
            other => StreamError::InvalidData(other.to_string()),
        }
    }
}
