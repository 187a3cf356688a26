//! Wavefront OBJ export for quad meshes and vertex import.

use crate::error::{ExportError, LoadError};
use crate::types::{PointSet, QuadMesh};
use glam::Vec3;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Write `mesh` as OBJ text: all `v` lines, then one `f` line per quad.
///
/// Face indices are 1-based in emission order. Vertices are not shared
/// between faces.
#[tracing::instrument(skip_all, fields(faces = mesh.face_count()))]
pub fn write_obj<W: Write>(mesh: &QuadMesh, writer: W) -> Result<(), ExportError> {
    let mut out = BufWriter::new(writer);

    writeln!(out, "# voxscan voxel surface mesh")?;
    writeln!(out, "# vertices {}", mesh.vertex_count())?;
    writeln!(out, "# faces {}", mesh.face_count())?;
    writeln!(out, "o ScanMesh")?;

    for v in mesh.vertices() {
        writeln!(out, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
    }
    for [a, b, c, d] in mesh.faces() {
        writeln!(out, "f {} {} {} {}", a + 1, b + 1, c + 1, d + 1)?;
    }

    out.flush()?;
    debug!(
        "Wrote OBJ with {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(())
}

/// Read every `v x y z` line from OBJ text, ignoring faces and other records.
pub fn parse_obj_vertices<R: BufRead>(reader: R) -> Result<PointSet, LoadError> {
    let mut points = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(rest) = line.trim().strip_prefix("v ") else {
            continue;
        };
        let coords: Vec<f32> = rest
            .split_whitespace()
            .take(3)
            .map(str::parse::<f32>)
            .collect::<Result<_, _>>()
            .map_err(|_| LoadError::MalformedVertex { line: number + 1 })?;
        if coords.len() < 3 {
            return Err(LoadError::MalformedVertex { line: number + 1 });
        }
        points.push(Vec3::new(coords[0], coords[1], coords[2]));
    }
    Ok(PointSet::new(points))
}

/// Load the vertex positions of an OBJ file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_obj_vertices(path: impl AsRef<Path>) -> Result<PointSet, LoadError> {
    let file = File::open(path.as_ref())?;
    let points = parse_obj_vertices(BufReader::new(file))?;
    debug!("Loaded {} OBJ vertices", points.len());
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> [Vec3; 4] {
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_write_obj_indices_are_one_based() {
        let mut mesh = QuadMesh::new();
        mesh.push_quad(unit_quad());
        mesh.push_quad(unit_quad());

        let mut buf = Vec::new();
        write_obj(&mesh, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let v_lines: Vec<&str> = text.lines().filter(|l| l.starts_with("v ")).collect();
        let f_lines: Vec<&str> = text.lines().filter(|l| l.starts_with("f ")).collect();
        assert_eq!(v_lines.len(), 8);
        assert_eq!(v_lines[1], "v 1.000000 0.000000 0.000000");
        assert_eq!(f_lines, vec!["f 1 2 3 4", "f 5 6 7 8"]);

        let lines: Vec<&str> = text.lines().collect();
        let last_v = lines.iter().rposition(|l| l.starts_with("v ")).unwrap();
        let first_f = lines.iter().position(|l| l.starts_with("f ")).unwrap();
        assert!(last_v < first_f);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_obj_reports_io_failure() {
        let mut mesh = QuadMesh::new();
        mesh.push_quad(unit_quad());
        let err = write_obj(&mesh, FailingWriter).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn test_write_obj_empty_mesh_is_header_only() {
        let mut buf = Vec::new();
        write_obj(&QuadMesh::new(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# vertices 0"));
        assert!(text.contains("# faces 0"));
        assert!(!text.lines().any(|l| l.starts_with("v ") || l.starts_with("f ")));
    }

    #[test]
    fn test_parse_obj_vertices() {
        let text = "# comment\no ScanMesh\nv 1.0 2.0 3.0\nvn 0 0 1\nv -1 -2 -3\nf 1 2 3 4\n";
        let points = parse_obj_vertices(text.as_bytes()).unwrap();
        assert_eq!(
            points.points(),
            &[Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, -2.0, -3.0)]
        );
    }

    #[test]
    fn test_parse_obj_vertices_rejects_short_line() {
        let err = parse_obj_vertices("v 1.0 2.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedVertex { line: 1 }));
    }
}
