//! Voxscan Capture - Depth frame sources
//!
//! Implementations of the [`DepthCamera`] trait from voxscan-recon:
//!
//! - Recorded sessions: a directory of 16-bit depth PNGs plus a JSON manifest
//!   with poses and intrinsics, replayed frame by frame
//! - A synthetic depth camera that ray-casts a simple scene while sliding
//!   sideways, for demos and tests
//!
//! ## Example
//!
//! ```ignore
//! use voxscan_capture::RecordedSource;
//! use voxscan_recon::{DepthCamera, ScanConfig, ScanEngine};
//!
//! let mut source = RecordedSource::open("scans/desk")?;
//! let mut engine = ScanEngine::new(ScanConfig::default())?;
//! engine.start_scanning();
//! while let Some(frame) = source.next_frame()? {
//!     engine.process_frame(&frame);
//! }
//! engine.stop_and_process()?;
//! ```

mod recorded;
mod source;
mod synthetic;

pub use recorded::{FrameRecord, MANIFEST_FILE, Manifest, RecordedSource, RecordingWriter};
pub use source::CaptureError;
pub use synthetic::{SyntheticScene, SyntheticSource};

// Re-export the camera trait for convenience
pub use voxscan_recon::ingest::{DepthCamera, StreamError};
