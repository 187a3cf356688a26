//! PLY vertex data structures

use glam::Vec3;

/// Vertex data extracted from a PLY file.
///
/// Scan exports carry positions only; color is kept when a file provides it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyVertex {
    pub position: Vec3,
    pub color: Option<Vec3>,
}
