//! Exposed-face meshing over voxel occupancy.
//!
//! Every occupied voxel emits one quad per axis-aligned neighbor that is not
//! occupied. Quads own their four vertices; nothing is shared between faces.

use crate::reconstruction::voxel::{VoxelKey, VoxelOccupancy};
use glam::{IVec3, Vec3};
use tracing::debug;
use voxscan_data::QuadMesh;

/// One cube face: the neighbor direction and its corners in half-leaf units,
/// counter-clockwise when seen from outside.
struct Face {
    normal: IVec3,
    corners: [Vec3; 4],
}

const FACES: [Face; 6] = [
    Face {
        normal: IVec3::X,
        corners: [
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ],
    },
    Face {
        normal: IVec3::NEG_X,
        corners: [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ],
    },
    Face {
        normal: IVec3::Y,
        corners: [
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ],
    },
    Face {
        normal: IVec3::NEG_Y,
        corners: [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        ],
    },
    Face {
        normal: IVec3::Z,
        corners: [
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ],
    },
    Face {
        normal: IVec3::NEG_Z,
        corners: [
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
        ],
    },
];

/// Build the exposed-face mesh for `occupancy`. Voxels are visited in key
/// order and faces in `+X -X +Y -Y +Z -Z` order, so output is deterministic.
pub fn exposed_face_mesh(occupancy: &VoxelOccupancy) -> QuadMesh {
    let leaf = occupancy.leaf_size();
    let half = leaf * 0.5;

    let exposed = |key: VoxelKey, face: &Face| !occupancy.contains(&key.offset(face.normal));
    let face_count: usize = occupancy
        .keys()
        .iter()
        .map(|&key| FACES.iter().filter(|face| exposed(key, face)).count())
        .sum();

    let mut mesh = QuadMesh::with_capacity(face_count);
    for &key in occupancy.keys() {
        let center = key.center(leaf);
        for face in FACES.iter().filter(|face| exposed(key, face)) {
            mesh.push_quad(face.corners.map(|c| center + c * half));
        }
    }

    debug!(
        "Meshed {} voxels into {} exposed faces",
        occupancy.len(),
        mesh.face_count()
    );
    mesh
}
