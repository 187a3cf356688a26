//! Depth unprojection: pixel + millimeter depth to a world-space point.
//!
//! Camera convention: x right, y up, looking down -z. Image rows grow
//! downward, so camera-space y is the negated row offset.

use crate::ingest::{DepthImage, Intrinsics, Pose};
use crate::reconstruction::Keyframe;
use glam::{Mat4, Vec2, Vec3};
use thiserror::Error;

/// Exclusive depth window in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthRange {
    pub min_mm: u16,
    pub max_mm: u16,
}

impl DepthRange {
    pub fn new(min_mm: u16, max_mm: u16) -> Self {
        Self { min_mm, max_mm }
    }

    /// `min_mm < depth_mm < max_mm`.
    pub fn contains(&self, depth_mm: u16) -> bool {
        depth_mm > self.min_mm && depth_mm < self.max_mm
    }
}

/// Why an unprojector could not be built for a frame.
#[derive(Debug, Error)]
pub enum UnprojectError {
    #[error("Degenerate intrinsics: {0:?}")]
    DegenerateIntrinsics(Intrinsics),

    #[error("Depth grid is empty")]
    EmptyDepth,

    #[error("Camera pose is not finite")]
    NonFinitePose,
}

/// Unprojects samples of one depth grid with fixed intrinsics and pose.
#[derive(Debug, Clone)]
pub struct Unprojector {
    /// Intrinsics rescaled to the depth grid.
    intrinsics: Intrinsics,
    camera_to_world: Mat4,
    world_to_camera: Mat4,
    range: DepthRange,
}

impl Unprojector {
    /// Build an unprojector for a `width` x `height` depth grid.
    ///
    /// `intrinsics` may be given for a different reference resolution; they
    /// are rescaled to the grid per axis.
    pub fn new(
        intrinsics: &Intrinsics,
        width: u32,
        height: u32,
        pose: &Pose,
        range: DepthRange,
    ) -> Result<Self, UnprojectError> {
        if width == 0 || height == 0 {
            return Err(UnprojectError::EmptyDepth);
        }
        if !intrinsics.is_valid() {
            return Err(UnprojectError::DegenerateIntrinsics(*intrinsics));
        }
        if !pose.is_finite() {
            return Err(UnprojectError::NonFinitePose);
        }

        let camera_to_world = pose.to_matrix();
        Ok(Self {
            intrinsics: intrinsics.scaled_to(width, height),
            camera_to_world,
            world_to_camera: camera_to_world.inverse(),
            range,
        })
    }

    /// Build an unprojector for a stored keyframe.
    pub fn for_keyframe(keyframe: &Keyframe, range: DepthRange) -> Result<Self, UnprojectError> {
        Self::new(
            &keyframe.intrinsics,
            keyframe.width(),
            keyframe.height(),
            &keyframe.pose,
            range,
        )
    }

    /// Intrinsics after rescaling to the depth grid.
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// Camera-space point for a pixel, or `None` if the depth is out of range.
    pub fn camera_point(&self, px: f32, py: f32, depth_mm: u16) -> Option<Vec3> {
        if !self.range.contains(depth_mm) {
            return None;
        }
        let k = &self.intrinsics;
        let d = depth_mm as f32 / 1000.0;
        Some(Vec3::new(
            (px - k.cx) * d / k.fx,
            -(py - k.cy) * d / k.fy,
            -d,
        ))
    }

    /// World-space point for a pixel, or `None` if the depth is out of range.
    pub fn unproject(&self, px: u32, py: u32, depth_mm: u16) -> Option<Vec3> {
        let camera = self.camera_point(px as f32, py as f32, depth_mm)?;
        let world = self.camera_to_world.transform_point3(camera);
        world.is_finite().then_some(world)
    }

    /// Inverse of [`Unprojector::unproject`]: pixel coordinates and depth in
    /// millimeters. `None` for points at or behind the camera.
    pub fn project(&self, world: Vec3) -> Option<(Vec2, f32)> {
        let camera = self.world_to_camera.transform_point3(world);
        let d = -camera.z;
        if d <= 0.0 {
            return None;
        }
        let k = &self.intrinsics;
        let pixel = Vec2::new(camera.x * k.fx / d + k.cx, -camera.y * k.fy / d + k.cy);
        Some((pixel, d * 1000.0))
    }

    /// Unproject every `stride`-th row and column of `depth`, skipping
    /// invalid samples.
    pub fn unproject_grid<'a>(
        &'a self,
        depth: &'a DepthImage,
        stride: u32,
    ) -> impl Iterator<Item = Vec3> + 'a {
        let stride = stride.max(1) as usize;
        let (width, height) = depth.dimensions();
        (0..height).step_by(stride).flat_map(move |y| {
            (0..width)
                .step_by(stride)
                .filter_map(move |x| self.unproject(x, y, depth.get_pixel(x, y)[0]))
        })
    }
}
