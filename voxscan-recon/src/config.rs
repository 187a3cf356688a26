//! Scan engine configuration.
//!
//! Every tunable of the engine lives here. All fields have defaults, so a JSON
//! file only needs to name the values it changes:
//!
//! ```json
//! { "voxel": { "leaf_size": 0.01 }, "sampling": { "preview_stride": 4 } }
//! ```

use crate::error::ConfigError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level engine configuration. Fixed for the lifetime of a [`crate::ScanEngine`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub keyframe: KeyframeConfig,
    pub depth: DepthConfig,
    pub sampling: SamplingConfig,
    pub voxel: VoxelConfig,
    pub roi: RoiConfig,
}

/// Motion gate for keyframe retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyframeConfig {
    /// Minimum camera translation (world units) between two keyframes.
    pub min_move: f32,
}

impl Default for KeyframeConfig {
    fn default() -> Self {
        Self { min_move: 0.05 }
    }
}

/// Accepted depth window in millimeters. Bounds are exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// Lower bound for the final reconstruction.
    pub min_mm: u16,
    /// Lower bound for the live preview.
    pub preview_min_mm: u16,
    pub max_mm: u16,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            min_mm: 100,
            preview_min_mm: 200,
            max_mm: 1500,
        }
    }
}

/// Pixel strides used when walking a depth grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub reconstruction_stride: u32,
    pub preview_stride: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            reconstruction_stride: 2,
            preview_stride: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelConfig {
    /// Edge length of one voxel in world units.
    pub leaf_size: f32,
    /// Voxels with fewer contributing samples are dropped from the point set.
    pub min_count: u32,
}

impl Default for VoxelConfig {
    fn default() -> Self {
        Self {
            leaf_size: 0.005,
            min_count: 1,
        }
    }
}

/// Working volume, expressed in the anchor pose's local frame (camera looks down -z).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            min: Vec3::new(-0.6, -1.0, -1.5),
            max: Vec3::new(0.6, 1.0, -0.2),
        }
    }
}

impl ScanConfig {
    /// Load a config from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!("Loaded scan config from {}", path.display());
        Ok(config)
    }

    /// Parse a config from JSON text and validate it.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(self.keyframe.min_move.is_finite() && self.keyframe.min_move >= 0.0) {
            return invalid(format!(
                "keyframe.min_move must be a non-negative number, got {}",
                self.keyframe.min_move
            ));
        }
        if !(self.voxel.leaf_size.is_finite() && self.voxel.leaf_size > 0.0) {
            return invalid(format!(
                "voxel.leaf_size must be positive, got {}",
                self.voxel.leaf_size
            ));
        }
        if self.voxel.min_count == 0 {
            return invalid("voxel.min_count must be at least 1".to_string());
        }
        if self.sampling.reconstruction_stride == 0 || self.sampling.preview_stride == 0 {
            return invalid("sampling strides must be at least 1".to_string());
        }
        if self.depth.min_mm >= self.depth.max_mm || self.depth.preview_min_mm >= self.depth.max_mm
        {
            return invalid(format!(
                "depth minimums ({} / {} mm) must be below max_mm ({} mm)",
                self.depth.min_mm, self.depth.preview_min_mm, self.depth.max_mm
            ));
        }
        if !(self.roi.min.is_finite() && self.roi.max.is_finite())
            || self.roi.min.cmpge(self.roi.max).any()
        {
            return invalid(format!(
                "roi.min {:?} must be strictly below roi.max {:?} on every axis",
                self.roi.min, self.roi.max
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.voxel.leaf_size, 0.005);
        assert_eq!(config.keyframe.min_move, 0.05);
        assert_eq!(config.depth.max_mm, 1500);
        assert_eq!(config.sampling.reconstruction_stride, 2);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ScanConfig::from_json_str(r#"{ "voxel": { "leaf_size": 0.01 } }"#).unwrap();
        assert_eq!(config.voxel.leaf_size, 0.01);
        assert_eq!(config.voxel.min_count, 1);
        assert_eq!(config.roi, RoiConfig::default());
    }

    #[test]
    fn test_roi_parses_as_arrays() {
        let config = ScanConfig::from_json_str(
            r#"{ "roi": { "min": [-1.0, -1.0, -2.0], "max": [1.0, 1.0, 0.0] } }"#,
        )
        .unwrap();
        assert_eq!(config.roi.min, Vec3::new(-1.0, -1.0, -2.0));
    }

    #[test]
    fn test_rejects_non_positive_leaf_size() {
        let mut config = ScanConfig::default();
        config.voxel.leaf_size = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_inverted_roi() {
        let mut config = ScanConfig::default();
        config.roi.min.z = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            ScanConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        std::fs::write(&path, r#"{ "sampling": { "preview_stride": 4 } }"#).unwrap();
        let config = ScanConfig::from_json_file(&path).unwrap();
        assert_eq!(config.sampling.preview_stride, 4);
    }
}
