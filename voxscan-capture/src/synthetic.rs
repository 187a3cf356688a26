//! Synthetic depth camera.
//!
//! Ray-casts a sphere in front of a flat backdrop while the camera slides
//! along +x, producing posed depth frames without any hardware.

use crate::source::CaptureError;
use glam::Vec3;
use image::Luma;
use voxscan_recon::ingest::{DepthCamera, DepthFrame, DepthImage, Intrinsics, Pose, StreamError};

/// Geometry rendered by a [`SyntheticSource`], in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticScene {
    pub sphere_center: Vec3,
    pub sphere_radius: f32,
    /// Distance of the backdrop plane `z = -backdrop_distance`. `None`
    /// leaves the background empty (depth 0).
    pub backdrop_distance: Option<f32>,
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self {
            sphere_center: Vec3::new(0.0, 0.0, -0.8),
            sphere_radius: 0.25,
            backdrop_distance: Some(1.2),
        }
    }
}

impl SyntheticScene {
    /// Distance along `dir` (unit length) to the nearest surface.
    fn cast(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let oc = origin - self.sphere_center;
        let b = oc.dot(dir);
        let c = oc.length_squared() - self.sphere_radius * self.sphere_radius;
        let disc = b * b - c;
        if disc >= 0.0 {
            let t = -b - disc.sqrt();
            if t > 0.0 {
                return Some(t);
            }
        }

        let plane_z = -self.backdrop_distance?;
        if dir.z.abs() < f32::EPSILON {
            return None;
        }
        let t = (plane_z - origin.z) / dir.z;
        (t > 0.0).then_some(t)
    }
}

/// A [`DepthCamera`] that renders [`SyntheticScene`] frames.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    scene: SyntheticScene,
    intrinsics: Intrinsics,
    width: u32,
    height: u32,
    start: Pose,
    step: f32,
    frame_count: usize,
    frame_rate: f32,
    index: usize,
    autofocus: bool,
}

impl SyntheticSource {
    /// `frame_count` frames of a 64x48 depth grid, moving 2 cm per frame.
    ///
    /// Intrinsics are given for a 640x480 reference image so consumers have
    /// to rescale them to the grid.
    pub fn new(frame_count: usize) -> Self {
        Self {
            scene: SyntheticScene::default(),
            intrinsics: Intrinsics::new(600.0, 600.0, 320.0, 240.0, 640, 480),
            width: 64,
            height: 48,
            start: Pose::IDENTITY,
            step: 0.02,
            frame_count,
            frame_rate: 30.0,
            index: 0,
            autofocus: false,
        }
    }

    pub fn with_scene(mut self, scene: SyntheticScene) -> Result<Self, CaptureError> {
        if !(scene.sphere_radius.is_finite() && scene.sphere_radius > 0.0) {
            return Err(CaptureError::InvalidScene(format!(
                "sphere radius must be positive, got {}",
                scene.sphere_radius
            )));
        }
        self.scene = scene;
        Ok(self)
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Camera translation per frame along +x.
    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub fn scene(&self) -> &SyntheticScene {
        &self.scene
    }

    pub fn autofocus(&self) -> bool {
        self.autofocus
    }

    /// Camera pose for frame `index`.
    pub fn pose_at(&self, index: usize) -> Pose {
        Pose::new(
            self.start.translation + Vec3::X * self.step * index as f32,
            self.start.rotation,
        )
    }

    /// Render frame `index` regardless of playback position.
    pub fn render(&self, index: usize) -> DepthFrame {
        let pose = self.pose_at(index);
        let k = self.intrinsics.scaled_to(self.width, self.height);

        let depth = DepthImage::from_fn(self.width, self.height, |x, y| {
            let ray = Vec3::new((x as f32 - k.cx) / k.fx, -(y as f32 - k.cy) / k.fy, -1.0);
            let dir = pose.rotation * ray.normalize();
            let mm = self
                .scene
                .cast(pose.translation, dir)
                // Depth along the optical axis, not along the ray.
                .map(|t| t * ray.normalize().z.abs() * 1000.0)
                .unwrap_or(0.0);
            Luma([mm.round().clamp(0.0, u16::MAX as f32) as u16])
        });

        DepthFrame::new(
            index as f64 / self.frame_rate as f64,
            pose,
            depth,
            self.intrinsics,
        )
    }
}

impl DepthCamera for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<DepthFrame>, StreamError> {
        if self.index >= self.frame_count {
            return Ok(None);
        }
        let frame = self.render(self.index);
        self.index += 1;
        Ok(Some(frame))
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.frame_rate)
    }

    fn is_active(&self) -> bool {
        self.index < self.frame_count
    }

    fn supports_depth(&self) -> bool {
        true
    }

    fn set_autofocus(&mut self, enabled: bool) -> Result<(), StreamError> {
        self.autofocus = enabled;
        Ok(())
    }
}
