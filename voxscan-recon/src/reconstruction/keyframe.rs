//! Keyframe retention based on camera translation.

use crate::ingest::{DepthFrame, DepthImage, Intrinsics, Pose};

/// A retained depth frame. Owns a copy of the depth grid.
#[derive(Debug, Clone)]
pub struct Keyframe {
    pub timestamp: f64,
    pub pose: Pose,
    pub depth: DepthImage,
    pub intrinsics: Intrinsics,
}

impl Keyframe {
    /// Copy a frame into a keyframe. Returns `None` if the frame has no depth.
    pub fn from_frame(frame: &DepthFrame) -> Option<Self> {
        Some(Self {
            timestamp: frame.timestamp,
            pose: frame.pose,
            depth: frame.depth.clone()?,
            intrinsics: frame.intrinsics,
        })
    }

    pub fn width(&self) -> u32 {
        self.depth.width()
    }

    pub fn height(&self) -> u32 {
        self.depth.height()
    }
}

/// Decides whether a frame becomes a keyframe.
///
/// A frame is retained when no keyframe exists yet or when the camera has
/// moved strictly more than `min_move` since the last retained one.
#[derive(Debug, Clone)]
pub struct KeyframeSelector {
    min_move: f32,
    last_pose: Option<Pose>,
}

impl KeyframeSelector {
    pub fn new(min_move: f32) -> Self {
        Self {
            min_move,
            last_pose: None,
        }
    }

    pub fn min_move(&self) -> f32 {
        self.min_move
    }

    /// Pose of the last retained keyframe.
    pub fn last_pose(&self) -> Option<&Pose> {
        self.last_pose.as_ref()
    }

    fn should_retain(&self, pose: &Pose) -> bool {
        match &self.last_pose {
            None => true,
            Some(last) => {
                last.translation.distance_squared(pose.translation) > self.min_move * self.min_move
            }
        }
    }

    /// Returns whether `pose` becomes a keyframe, recording it as the new
    /// reference if so.
    pub fn consider(&mut self, pose: &Pose) -> bool {
        let retain = self.should_retain(pose);
        if retain {
            self.last_pose = Some(*pose);
        }
        retain
    }

    pub fn reset(&mut self) {
        self.last_pose = None;
    }
}

impl Default for KeyframeSelector {
    fn default() -> Self {
        Self::new(0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_first_pose_is_always_retained() {
        let mut selector = KeyframeSelector::default();
        assert!(selector.consider(&Pose::from_translation(Vec3::new(10.0, 0.0, 0.0))));
        assert!(selector.last_pose().is_some());
    }

    #[test]
    fn test_small_moves_are_rejected() {
        let mut selector = KeyframeSelector::default();
        let origin = Pose::IDENTITY;
        assert!(selector.consider(&origin));

        for step in [0.0, 0.01, 0.03, 0.049] {
            let pose = Pose::from_translation(Vec3::new(step, 0.0, 0.0));
            assert!(!selector.consider(&pose), "step {step} should not be retained");
        }
        // The reference stays at the first keyframe.
        assert_eq!(selector.last_pose(), Some(&origin));
    }

    #[test]
    fn test_move_beyond_threshold_is_retained() {
        let mut selector = KeyframeSelector::default();
        assert!(selector.consider(&Pose::IDENTITY));
        let moved = Pose::from_translation(Vec3::new(0.0, 0.06, 0.08));
        assert!(selector.consider(&moved));
        assert_eq!(selector.last_pose(), Some(&moved));
    }

    #[test]
    fn test_rotation_alone_is_not_motion() {
        let mut selector = KeyframeSelector::default();
        assert!(selector.consider(&Pose::IDENTITY));
        let turned = Pose::new(Vec3::ZERO, Quat::from_rotation_y(1.5));
        assert!(!selector.consider(&turned));
    }

    #[test]
    fn test_reset_forgets_last_pose() {
        let mut selector = KeyframeSelector::default();
        assert!(selector.consider(&Pose::IDENTITY));
        selector.reset();
        assert!(selector.consider(&Pose::IDENTITY));
    }

    #[test]
    fn test_keyframe_copies_depth() {
        let depth = DepthImage::from_pixel(2, 3, image::Luma([500]));
        let k = Intrinsics::new(1.0, 1.0, 1.0, 1.0, 2, 3);
        let frame = DepthFrame::new(1.5, Pose::IDENTITY, depth, k);
        let keyframe = Keyframe::from_frame(&frame).unwrap();
        assert_eq!((keyframe.width(), keyframe.height()), (2, 3));
        assert_eq!(keyframe.timestamp, 1.5);

        let no_depth = DepthFrame::without_depth(0.0, Pose::IDENTITY, k);
        assert!(Keyframe::from_frame(&no_depth).is_none());
    }
}
