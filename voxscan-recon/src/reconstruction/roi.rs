//! Region-of-interest filtering relative to the scan's anchor pose.

use crate::config::RoiConfig;
use crate::ingest::Pose;
use glam::{Mat4, Vec3};

/// Axis-aligned box in anchor-local coordinates. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl RoiBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_config(config: &RoiConfig) -> Self {
        Self::new(config.min, config.max)
    }

    pub fn contains(&self, local: Vec3) -> bool {
        local.cmpge(self.min).all() && local.cmple(self.max).all()
    }
}

impl Default for RoiBox {
    fn default() -> Self {
        Self::from_config(&RoiConfig::default())
    }
}

/// The anchor pose as a matrix together with its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorFrame {
    matrix: Mat4,
    inverse: Mat4,
}

impl AnchorFrame {
    pub fn from_pose(pose: &Pose) -> Self {
        let matrix = pose.to_matrix();
        Self {
            matrix,
            inverse: matrix.inverse(),
        }
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// World point expressed in the anchor's local frame.
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.inverse.transform_point3(world)
    }
}

/// Accepts world points that fall inside the box around the anchor.
#[derive(Debug, Clone, Copy)]
pub struct RoiFilter {
    anchor: AnchorFrame,
    bounds: RoiBox,
}

impl RoiFilter {
    pub fn new(anchor: &Pose, bounds: RoiBox) -> Self {
        Self {
            anchor: AnchorFrame::from_pose(anchor),
            bounds,
        }
    }

    pub fn anchor(&self) -> &AnchorFrame {
        &self.anchor
    }

    pub fn bounds(&self) -> &RoiBox {
        &self.bounds
    }

    pub fn accepts(&self, world: Vec3) -> bool {
        self.bounds.contains(self.anchor.to_local(world))
    }
}
