//! Data ingestion module
//!
//! Provides the types a frame source hands to the engine:
//! - Posed depth frames with intrinsics and tracking state
//! - The camera interface the engine drives (frame pull, depth check, autofocus)

pub mod camera;
pub mod frame;

pub use camera::{DepthCamera, StreamError};
pub use frame::{DepthFrame, DepthImage, Intrinsics, Pose, TrackingState};
