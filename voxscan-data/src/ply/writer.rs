//! ASCII PLY point cloud writer

use crate::error::ExportError;
use crate::types::PointSet;
use std::io::{BufWriter, Write};
use tracing::debug;

/// Write `points` as an ASCII PLY point cloud.
///
/// Coordinates are written with six decimals and always use `.` as the
/// decimal separator. Output depends only on the point set, so writing the
/// same set twice yields identical bytes.
#[tracing::instrument(skip_all, fields(points = points.len()))]
pub fn write_ply<W: Write>(points: &PointSet, writer: W) -> Result<(), ExportError> {
    let mut out = BufWriter::new(writer);

    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", points.len())?;
    writeln!(out, "property float x")?;
    writeln!(out, "property float y")?;
    writeln!(out, "property float z")?;
    writeln!(out, "end_header")?;

    for p in points.iter() {
        writeln!(out, "{:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
    }

    out.flush()?;
    debug!("Wrote PLY with {} points", points.len());
    Ok(())
}
