//! Coarse per-frame point cloud for live feedback while scanning.

use crate::config::ScanConfig;
use crate::ingest::DepthFrame;
use crate::reconstruction::unproject::{DepthRange, Unprojector};
use voxscan_data::PointSet;

/// Strided unprojection of a single frame. No ROI, no voxel fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivePreview {
    range: DepthRange,
    stride: u32,
}

impl LivePreview {
    pub fn new(range: DepthRange, stride: u32) -> Self {
        Self { range, stride }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            DepthRange::new(config.depth.preview_min_mm, config.depth.max_mm),
            config.sampling.preview_stride,
        )
    }

    /// Preview points for `frame`, or `None` if the frame has no usable depth.
    pub fn generate(&self, frame: &DepthFrame) -> Option<PointSet> {
        let depth = frame.depth.as_ref()?;
        let unprojector = Unprojector::new(
            &frame.intrinsics,
            depth.width(),
            depth.height(),
            &frame.pose,
            self.range,
        )
        .ok()?;
        Some(unprojector.unproject_grid(depth, self.stride).collect())
    }
}

impl Default for LivePreview {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}
