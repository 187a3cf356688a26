//! Posed depth frames as delivered by a depth camera.

use glam::{Mat4, Quat, Vec3};
use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

/// A depth grid of unsigned millimeter samples. `0` marks an invalid sample.
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Rigid camera-to-world transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// A pose with identity orientation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    /// Decompose a rigid 4x4 transform. Any scale in `matrix` is discarded.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (_scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self::new(translation, rotation)
    }

    /// The 4x4 camera-to-world matrix.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Pinhole intrinsics, given for a reference image resolution that may differ
/// from the depth grid's actual resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    /// Reference image width the values above were calibrated for.
    pub width: u32,
    /// Reference image height the values above were calibrated for.
    pub height: u32,
}

impl Intrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Rescale to a grid of `width` x `height`, independently per axis.
    pub fn scaled_to(&self, width: u32, height: u32) -> Intrinsics {
        let sx = width as f32 / self.width as f32;
        let sy = height as f32 / self.height as f32;
        Intrinsics {
            fx: self.fx * sx,
            fy: self.fy * sy,
            cx: self.cx * sx,
            cy: self.cy * sy,
            width,
            height,
        }
    }

    /// Usable for unprojection: positive finite focal lengths, finite
    /// principal point and non-zero reference size.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.fx.is_finite()
            && self.fy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
            && self.cx.is_finite()
            && self.cy.is_finite()
    }
}

/// Tracking quality reported with each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    Tracking,
    /// Tracking is temporarily lost; the pose should not be trusted.
    Paused,
    Stopped,
}

/// One frame from a depth camera.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    /// Timestamp in seconds (relative to stream start).
    pub timestamp: f64,
    pub pose: Pose,
    /// `None` when the depth image could not be acquired for this frame.
    pub depth: Option<DepthImage>,
    pub intrinsics: Intrinsics,
    pub tracking: TrackingState,
}

impl DepthFrame {
    /// Create a tracked frame with depth.
    pub fn new(timestamp: f64, pose: Pose, depth: DepthImage, intrinsics: Intrinsics) -> Self {
        Self {
            timestamp,
            pose,
            depth: Some(depth),
            intrinsics,
            tracking: TrackingState::Tracking,
        }
    }

    /// Create a frame whose depth image was unavailable.
    pub fn without_depth(timestamp: f64, pose: Pose, intrinsics: Intrinsics) -> Self {
        Self {
            timestamp,
            pose,
            depth: None,
            intrinsics,
            tracking: TrackingState::Tracking,
        }
    }

    pub fn with_tracking(mut self, tracking: TrackingState) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking == TrackingState::Tracking
    }

    /// Depth at the center pixel in meters, if that sample is valid.
    pub fn center_depth_m(&self) -> Option<f32> {
        let depth = self.depth.as_ref()?;
        let (w, h) = depth.dimensions();
        if w == 0 || h == 0 {
            return None;
        }
        let mm = depth.get_pixel(w / 2, h / 2)[0];
        (mm > 0).then(|| mm as f32 / 1000.0)
    }
}
