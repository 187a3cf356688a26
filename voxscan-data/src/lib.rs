//! Voxscan Data Crate
//!
//! Geometry types and file formats for reconstructed scans.
//! This crate is engine-agnostic: it knows nothing about depth frames or
//! sessions, only about point sets, quad meshes and how to read and write them.

pub mod error;
pub mod io;
pub mod obj;
pub mod ply;
pub mod types;

pub use error::{ExportError, LoadError};
pub use io::{load_points, write_file_atomically};
pub use obj::{load_obj_vertices, parse_obj_vertices, write_obj};
pub use ply::{PlyVertex, load_points_from_ply, load_vertices_from_ply, write_ply};
pub use types::{PointSet, QuadMesh};
