//! File-level helpers shared by the exporters and loaders.

use crate::error::{ExportError, LoadError};
use crate::obj::load_obj_vertices;
use crate::ply::load_points_from_ply;
use crate::types::PointSet;
use std::fs::{self, File};
use std::path::Path;
use tracing::warn;

/// Write a file through a sibling `.partial` file and rename it into place.
///
/// If `write` fails the partial file is removed and `path` is left untouched,
/// so a failed export never truncates an earlier good file.
pub fn write_file_atomically<F>(path: &Path, write: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut File) -> Result<(), ExportError>,
{
    let file_name = path
        .file_name()
        .ok_or_else(|| ExportError::InvalidPath(path.to_path_buf()))?;
    let mut partial_name = file_name.to_os_string();
    partial_name.push(".partial");
    let partial_path = path.with_file_name(partial_name);

    let result: Result<(), ExportError> = (|| {
        let mut file = File::create(&partial_path)?;
        write(&mut file)?;
        file.sync_all()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            fs::rename(&partial_path, path)?;
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&partial_path) {
                warn!(
                    "Failed to remove partial export {}: {}",
                    partial_path.display(),
                    cleanup
                );
            }
            Err(e)
        }
    }
}

/// Load point positions from a `.ply` or `.obj` file, chosen by extension.
pub fn load_points(path: impl AsRef<Path>) -> Result<PointSet, LoadError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "ply" => load_points_from_ply(path),
        "obj" => load_obj_vertices(path),
        _ => Err(LoadError::UnsupportedExtension(extension)),
    }
}
