//! Core data types for reconstructed geometry.
//!
//! These are CPU-side representations shared by the reconstruction engine,
//! the exporters and any external renderer.

use glam::Vec3;

/// An ordered sequence of points in world space.
///
/// Point order carries no meaning; it is whatever order the producer emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    points: Vec<Vec3>,
}

impl PointSet {
    /// Create a point set from positions.
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    /// Create an empty point set.
    pub fn empty() -> Self {
        Self { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Borrow the positions.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec3> {
        self.points.iter()
    }

    /// Take ownership of the positions.
    pub fn into_inner(self) -> Vec<Vec3> {
        self.points
    }

    /// Raw `x y z` float bytes, ready for upload to a vertex buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.points)
    }

    /// Axis-aligned bounds `(min, max)`, or `None` for an empty set.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.points.first()?;
        Some(
            self.points
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }

    /// Scale uniformly so the largest absolute coordinate becomes 1.
    ///
    /// Sets whose coordinates are all zero are returned unchanged.
    pub fn normalized_to_unit_cube(&self) -> PointSet {
        let max_abs = self
            .points
            .iter()
            .map(|p| p.abs().max_element())
            .fold(0.0_f32, f32::max);
        if max_abs == 0.0 {
            return self.clone();
        }
        let scale = 1.0 / max_abs;
        self.points.iter().map(|p| *p * scale).collect()
    }
}

impl From<Vec<Vec3>> for PointSet {
    fn from(points: Vec<Vec3>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Vec3> for PointSet {
    fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A mesh made only of quads, with every quad owning its four vertices.
///
/// Face indices are 0-based into `vertices`; writers translate to whatever
/// base their format needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadMesh {
    vertices: Vec<Vec3>,
    faces: Vec<[u32; 4]>,
}

impl QuadMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mesh with room for `quads` faces.
    pub fn with_capacity(quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(quads * 4),
            faces: Vec::with_capacity(quads),
        }
    }

    /// Append a quad with its own four corners, in winding order.
    pub fn push_quad(&mut self, corners: [Vec3; 4]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.faces.push([base, base + 1, base + 2, base + 3]);
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[u32; 4]] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_set_bounds() {
        let set = PointSet::new(vec![
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 4.0, 0.5),
        ]);
        let (min, max) = set.bounds().unwrap();
        assert_eq!(min, Vec3::new(-1.0, -2.0, 0.5));
        assert_eq!(max, Vec3::new(1.0, 4.0, 3.0));
        assert!(PointSet::empty().bounds().is_none());
    }

    #[test]
    fn test_point_set_as_bytes() {
        let set = PointSet::new(vec![Vec3::new(1.0, 2.0, 3.0)]);
        let bytes = set.as_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0_f32.to_ne_bytes());
    }

    #[test]
    fn test_normalized_to_unit_cube() {
        let set = PointSet::new(vec![Vec3::new(2.0, -4.0, 1.0), Vec3::new(0.0, 1.0, 0.0)]);
        let normalized = set.normalized_to_unit_cube();
        assert_eq!(normalized.points()[0], Vec3::new(0.5, -1.0, 0.25));
        assert_eq!(normalized.points()[1], Vec3::new(0.0, 0.25, 0.0));

        let zeros = PointSet::new(vec![Vec3::ZERO]);
        assert_eq!(zeros.normalized_to_unit_cube(), zeros);
    }

    #[test]
    fn test_quad_mesh_owns_vertices() {
        let mut mesh = QuadMesh::new();
        let quad = [Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y];
        mesh.push_quad(quad);
        mesh.push_quad(quad);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.faces()[1], [4, 5, 6, 7]);
    }
}
