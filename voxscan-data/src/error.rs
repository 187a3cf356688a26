//! Error types for export and import of scan geometry.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing a point set or mesh.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error during export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export path has no file name: {0}")]
    InvalidPath(PathBuf),
}

/// Errors that can occur while reading a previously exported file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PLY parsing error: {0}")]
    Ply(String),

    #[error("Missing '{property}' at vertex {index}")]
    MissingProperty { property: &'static str, index: usize },

    #[error("Malformed OBJ vertex on line {line}")]
    MalformedVertex { line: usize },

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
}
