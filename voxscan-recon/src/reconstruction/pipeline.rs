//! Final reconstruction: keyframes to a voxel-filtered point set.

use crate::config::ScanConfig;
use crate::ingest::Pose;
use crate::reconstruction::keyframe::Keyframe;
use crate::reconstruction::mesh::exposed_face_mesh;
use crate::reconstruction::roi::{RoiBox, RoiFilter};
use crate::reconstruction::unproject::{DepthRange, Unprojector};
use crate::reconstruction::voxel::{VoxelGrid, VoxelOccupancy};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, info, warn};
use voxscan_data::{PointSet, QuadMesh};

/// Parameters for one reconstruction run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructionParams {
    pub range: DepthRange,
    /// Visit every `stride`-th row and column of each keyframe.
    pub stride: u32,
    pub leaf_size: f32,
    pub min_count: u32,
    pub roi: RoiBox,
}

impl ReconstructionParams {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            range: DepthRange::new(config.depth.min_mm, config.depth.max_mm),
            stride: config.sampling.reconstruction_stride,
            leaf_size: config.voxel.leaf_size,
            min_count: config.voxel.min_count,
            roi: RoiBox::from_config(&config.roi),
        }
    }
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

/// Output of a completed reconstruction.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// One centroid per voxel that met the minimum count.
    pub points: Arc<PointSet>,
    /// Every voxel that received at least one sample. The mesh is built from this.
    pub occupancy: VoxelOccupancy,
    pub keyframes_used: usize,
    /// Keyframes that could not be unprojected at all.
    pub keyframes_skipped: usize,
}

impl ScanResult {
    pub fn empty(leaf_size: f32) -> Self {
        Self {
            points: Arc::new(PointSet::empty()),
            occupancy: VoxelOccupancy::empty(leaf_size),
            keyframes_used: 0,
            keyframes_skipped: 0,
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Exposed-face quad mesh over the occupied voxels.
    pub fn mesh(&self) -> QuadMesh {
        exposed_face_mesh(&self.occupancy)
    }
}

/// Runs unprojection, ROI filtering and voxel aggregation over keyframes.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionPipeline {
    params: ReconstructionParams,
}

impl ReconstructionPipeline {
    pub fn new(params: ReconstructionParams) -> Self {
        Self { params }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(ReconstructionParams::from_config(config))
    }

    pub fn params(&self) -> &ReconstructionParams {
        &self.params
    }

    /// Fuse `keyframes` into a [`ScanResult`].
    ///
    /// The ROI box is placed at `anchor`, or at the first keyframe's pose when
    /// no anchor is given. `progress` is called with `processed / total` after
    /// every keyframe; returning `Break` abandons the run and yields `None`.
    /// Keyframes that cannot be unprojected are skipped and counted.
    #[tracing::instrument(skip_all, fields(keyframes = keyframes.len()))]
    pub fn run(
        &self,
        keyframes: &[Keyframe],
        anchor: Option<&Pose>,
        progress: &mut dyn FnMut(f32) -> ControlFlow<()>,
    ) -> Option<ScanResult> {
        let params = &self.params;
        let Some(anchor) = anchor.or_else(|| keyframes.first().map(|k| &k.pose)) else {
            debug!("No keyframes captured, producing an empty result");
            return Some(ScanResult::empty(params.leaf_size));
        };

        let roi = RoiFilter::new(anchor, params.roi);
        let mut grid = VoxelGrid::new(params.leaf_size);
        let mut skipped = 0;
        let total = keyframes.len();

        for (index, keyframe) in keyframes.iter().enumerate() {
            match Unprojector::for_keyframe(keyframe, params.range) {
                Ok(unprojector) => {
                    for point in unprojector.unproject_grid(&keyframe.depth, params.stride) {
                        if roi.accepts(point) {
                            grid.insert(point);
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping keyframe {} (t={:.3}): {}", index, keyframe.timestamp, e);
                    skipped += 1;
                }
            }

            if progress((index + 1) as f32 / total as f32).is_break() {
                debug!("Reconstruction abandoned after {} of {} keyframes", index + 1, total);
                return None;
            }
        }

        let points = grid.centroids(params.min_count);
        info!(
            "Reconstructed {} points from {} voxels ({} keyframes, {} skipped)",
            points.len(),
            grid.len(),
            total,
            skipped
        );

        Some(ScanResult {
            points: Arc::new(points),
            occupancy: grid.occupancy(),
            keyframes_used: total - skipped,
            keyframes_skipped: skipped,
        })
    }
}
