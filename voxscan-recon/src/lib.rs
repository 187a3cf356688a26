//! Voxscan Reconstruction Crate
//!
//! This crate turns a stream of posed depth frames into a denoised, spatially
//! bounded point cloud. It keeps a motion-gated list of keyframes while a scan
//! is running, fuses them into a voxel grid on a worker thread once the scan
//! stops, and publishes a cheap live preview for every frame in between.
//!
//! ## Modules
//!
//! - [`ingest`]: Depth frame types and the camera interface frames arrive through
//! - [`reconstruction`]: Keyframe selection, unprojection, ROI filtering, voxel fusion and meshing
//! - [`session`]: The scan engine state machine, published snapshots and events
//! - [`config`]: Tunable parameters, loadable from JSON

pub mod config;
pub mod error;
pub mod ingest;
pub mod reconstruction;
pub mod session;

pub use config::ScanConfig;
pub use error::{ConfigError, SessionError};
pub use ingest::{DepthCamera, DepthFrame, DepthImage, Intrinsics, Pose, TrackingState};
pub use reconstruction::ScanResult;
pub use session::{FrameOutcome, ScanEngine, ScanEvent, ScanView, SessionState, SkipReason};
