//! ASCII PLY export and PLY loading

mod loader;
mod vertex;
mod writer;

pub use loader::{load_points_from_ply, load_vertices_from_ply};
pub use vertex::PlyVertex;
pub use writer::write_ply;
