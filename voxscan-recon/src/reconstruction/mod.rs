//! Scene reconstruction from depth keyframes
//!
//! The pieces here are pure and single-threaded; the session module decides
//! which thread runs them.
//!
//! - [`keyframe`]: motion-gated keyframe retention
//! - [`unproject`]: pixel + depth to world-space points
//! - [`roi`]: anchor-relative working volume
//! - [`voxel`]: integer-keyed voxel grid with centroid accumulation
//! - [`mesh`]: exposed-face quad mesh over voxel occupancy
//! - [`pipeline`]: the full keyframe to point set run
//! - [`preview`]: cheap per-frame preview cloud

pub mod keyframe;
pub mod mesh;
pub mod pipeline;
pub mod preview;
pub mod roi;
pub mod unproject;
pub mod voxel;

pub use keyframe::{Keyframe, KeyframeSelector};
pub use mesh::exposed_face_mesh;
pub use pipeline::{ReconstructionParams, ReconstructionPipeline, ScanResult};
pub use preview::LivePreview;
pub use roi::{AnchorFrame, RoiBox, RoiFilter};
pub use unproject::{DepthRange, UnprojectError, Unprojector};
pub use voxel::{VoxelAccumulator, VoxelGrid, VoxelHasher, VoxelKey, VoxelOccupancy};
