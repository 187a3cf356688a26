//! Integer-keyed voxel grid with per-voxel centroid accumulation.
//!
//! Keys are `(floor(x / L), floor(y / L), floor(z / L))` for leaf size `L`.
//! Each occupied voxel keeps a running sum and count; finalization emits one
//! centroid per voxel. The grid doubles as a grid-snap denoiser and as the
//! occupancy source for meshing.

use glam::{DVec3, IVec3, Vec3};
use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hash, Hasher};
use voxscan_data::PointSet;

/// Integer voxel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VoxelKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelKey {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Voxel containing `point`, or `None` for non-finite points or points
    /// beyond the `i32` index range.
    pub fn from_point(point: Vec3, leaf_size: f32) -> Option<Self> {
        let scaled = (point / leaf_size).floor();
        if !scaled.is_finite() || scaled.abs().max_element() >= i32::MAX as f32 {
            return None;
        }
        Some(Self::new(scaled.x as i32, scaled.y as i32, scaled.z as i32))
    }

    pub fn offset(self, delta: IVec3) -> Self {
        Self::new(
            self.x.wrapping_add(delta.x),
            self.y.wrapping_add(delta.y),
            self.z.wrapping_add(delta.z),
        )
    }

    /// Geometric center: `(index + 0.5) * leaf_size` per axis.
    pub fn center(self, leaf_size: f32) -> Vec3 {
        let index = DVec3::new(self.x as f64, self.y as f64, self.z as f64);
        ((index + 0.5) * leaf_size as f64).as_vec3()
    }

    /// Large-prime XOR spatial hash over the three coordinates.
    fn spatial_hash(self) -> u64 {
        (self.x as i64 as u64).wrapping_mul(73_856_093)
            ^ (self.y as i64 as u64).wrapping_mul(19_349_663)
            ^ (self.z as i64 as u64).wrapping_mul(83_492_791)
    }
}

impl Hash for VoxelKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.spatial_hash());
    }
}

/// Hasher for [`VoxelKey`] maps. Finishes the spatial hash with a 64-bit
/// avalanche so every output bit depends on every coordinate bit.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoxelHasher {
    state: u64,
}

impl VoxelHasher {
    fn mix(mut z: u64) -> u64 {
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

impl Hasher for VoxelHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = Self::mix(self.state ^ b as u64);
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.state = Self::mix(self.state ^ n);
    }
}

pub type VoxelBuildHasher = BuildHasherDefault<VoxelHasher>;

/// Running sum of the points that fell into one voxel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoxelAccumulator {
    pub sum: DVec3,
    pub count: u32,
}

impl VoxelAccumulator {
    pub fn add(&mut self, point: Vec3) {
        self.sum += point.as_dvec3();
        self.count += 1;
    }

    /// Mean of all added points. Only meaningful when `count > 0`.
    pub fn centroid(&self) -> Vec3 {
        (self.sum / self.count.max(1) as f64).as_vec3()
    }
}

/// Sparse voxel grid keyed by [`VoxelKey`].
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    leaf_size: f32,
    cells: HashMap<VoxelKey, VoxelAccumulator, VoxelBuildHasher>,
}

impl VoxelGrid {
    pub fn new(leaf_size: f32) -> Self {
        Self {
            leaf_size,
            cells: HashMap::default(),
        }
    }

    pub fn leaf_size(&self) -> f32 {
        self.leaf_size
    }

    /// Number of occupied voxels.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Accumulate a point. Returns `false` (and ignores the point) if it
    /// cannot be keyed.
    pub fn insert(&mut self, point: Vec3) -> bool {
        let Some(key) = VoxelKey::from_point(point, self.leaf_size) else {
            return false;
        };
        self.cells.entry(key).or_default().add(point);
        true
    }

    pub fn get(&self, key: &VoxelKey) -> Option<&VoxelAccumulator> {
        self.cells.get(key)
    }

    /// One centroid per voxel with at least `min_count` points, in key order.
    pub fn centroids(&self, min_count: u32) -> PointSet {
        let mut cells: Vec<(&VoxelKey, &VoxelAccumulator)> = self
            .cells
            .iter()
            .filter(|(_, acc)| acc.count >= min_count)
            .collect();
        cells.sort_unstable_by_key(|(key, _)| **key);
        cells.into_iter().map(|(_, acc)| acc.centroid()).collect()
    }

    /// Every voxel that received at least one point.
    pub fn occupancy(&self) -> VoxelOccupancy {
        VoxelOccupancy::from_keys(self.leaf_size, self.cells.keys().copied())
    }
}

/// The set of occupied voxel keys from a reconstruction run.
///
/// Keys are kept sorted so anything derived from them is deterministic.
#[derive(Debug, Clone, Default)]
pub struct VoxelOccupancy {
    leaf_size: f32,
    keys: Vec<VoxelKey>,
    lookup: HashSet<VoxelKey, VoxelBuildHasher>,
}

impl VoxelOccupancy {
    pub fn empty(leaf_size: f32) -> Self {
        Self {
            leaf_size,
            ..Self::default()
        }
    }

    pub fn from_keys(leaf_size: f32, keys: impl IntoIterator<Item = VoxelKey>) -> Self {
        let lookup: HashSet<VoxelKey, VoxelBuildHasher> = keys.into_iter().collect();
        let mut keys: Vec<VoxelKey> = lookup.iter().copied().collect();
        keys.sort_unstable();
        Self {
            leaf_size,
            keys,
            lookup,
        }
    }

    pub fn leaf_size(&self) -> f32 {
        self.leaf_size
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &VoxelKey) -> bool {
        self.lookup.contains(key)
    }

    /// Occupied keys in ascending order.
    pub fn keys(&self) -> &[VoxelKey] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::BuildHasher;

    #[test]
    fn test_key_floors_negative_coordinates() {
        let key = VoxelKey::from_point(Vec3::new(-0.001, 0.0, 0.0099), 0.005).unwrap();
        assert_eq!(key, VoxelKey::new(-1, 0, 1));
        let key = VoxelKey::from_point(Vec3::new(-0.5, 0.5, -1.0), 1.0).unwrap();
        assert_eq!(key, VoxelKey::new(-1, 0, -1));
    }

    #[test]
    fn test_key_rejects_unkeyable_points() {
        assert!(VoxelKey::from_point(Vec3::new(f32::NAN, 0.0, 0.0), 0.005).is_none());
        assert!(VoxelKey::from_point(Vec3::new(f32::INFINITY, 0.0, 0.0), 0.005).is_none());
        assert!(VoxelKey::from_point(Vec3::new(1e30, 0.0, 0.0), 0.005).is_none());
    }

    #[test]
    fn test_signed_keys_do_not_collide() {
        // "1,-12" vs "11,-2" style ambiguities cannot happen with integer keys.
        let a = VoxelKey::new(1, -12, 0);
        let b = VoxelKey::new(11, -2, 0);
        assert_ne!(a, b);
        let mut grid = VoxelGrid::new(1.0);
        grid.insert(Vec3::new(1.5, -11.5, 0.5));
        grid.insert(Vec3::new(11.5, -1.5, 0.5));
        assert_eq!(grid.len(), 2);
        assert!(grid.get(&a).is_some());
        assert!(grid.get(&b).is_some());
    }

    #[test]
    fn test_hasher_spreads_neighbors() {
        let build = VoxelBuildHasher::default();
        let h0 = build.hash_one(VoxelKey::new(0, 0, 0));
        let h1 = build.hash_one(VoxelKey::new(1, 0, 0));
        let h2 = build.hash_one(VoxelKey::new(0, 1, 0));
        assert_ne!(h0, h1);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_center() {
        assert_eq!(VoxelKey::new(0, -1, 2).center(1.0), Vec3::new(0.5, -0.5, 2.5));
        let c = VoxelKey::new(-1, -1, -1).center(0.005);
        assert!((c - Vec3::splat(-0.0025)).length() < 1e-9);
    }

    #[test]
    fn test_centroid_accumulation() {
        let mut grid = VoxelGrid::new(1.0);
        grid.insert(Vec3::new(0.1, 0.2, 0.3));
        grid.insert(Vec3::new(0.3, 0.4, 0.5));
        grid.insert(Vec3::new(2.5, 0.5, 0.5));
        assert_eq!(grid.len(), 2);

        let acc = grid.get(&VoxelKey::new(0, 0, 0)).unwrap();
        assert_eq!(acc.count, 2);
        assert!((acc.centroid() - Vec3::new(0.2, 0.3, 0.4)).length() < 1e-6);
    }

    #[test]
    fn test_min_count_filters_voxels() {
        let mut grid = VoxelGrid::new(1.0);
        grid.insert(Vec3::new(0.1, 0.1, 0.1));
        grid.insert(Vec3::new(0.2, 0.2, 0.2));
        grid.insert(Vec3::new(5.5, 5.5, 5.5));

        assert_eq!(grid.centroids(1).len(), 2);
        assert_eq!(grid.centroids(2).len(), 1);
        assert_eq!(grid.centroids(3).len(), 0);
        // Occupancy ignores the count threshold.
        assert_eq!(grid.occupancy().len(), 2);
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let points: Vec<Vec3> = (0..500)
            .map(|i| {
                let t = i as f32;
                Vec3::new((t * 0.731).sin(), (t * 0.419).cos(), (t * 0.257).sin() * 0.5)
            })
            .collect();

        let mut forward = VoxelGrid::new(0.1);
        for p in &points {
            forward.insert(*p);
        }
        let mut reversed = VoxelGrid::new(0.1);
        for p in points.iter().rev() {
            reversed.insert(*p);
        }
        let mut interleaved = VoxelGrid::new(0.1);
        for p in points.iter().step_by(2).chain(points.iter().skip(1).step_by(2)) {
            interleaved.insert(*p);
        }

        let a = forward.centroids(1);
        for other in [reversed.centroids(1), interleaved.centroids(1)] {
            assert_eq!(a.len(), other.len());
            for (p, q) in a.iter().zip(other.iter()) {
                assert!((*p - *q).length() < 1e-6);
            }
        }
    }

    #[test]
    fn test_occupancy_is_sorted() {
        let occupancy = VoxelOccupancy::from_keys(
            1.0,
            [
                VoxelKey::new(2, 0, 0),
                VoxelKey::new(-1, 5, 0),
                VoxelKey::new(2, 0, 0),
            ],
        );
        assert_eq!(occupancy.len(), 2);
        assert_eq!(occupancy.keys()[0], VoxelKey::new(-1, 5, 0));
        assert!(occupancy.contains(&VoxelKey::new(2, 0, 0)));
        assert!(!occupancy.contains(&VoxelKey::new(0, 0, 0)));
    }
}
