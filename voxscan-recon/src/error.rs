//! Error types for configuration and session control.

use crate::ingest::StreamError;
use crate::session::SessionState;
use thiserror::Error;
use voxscan_data::ExportError;

/// Errors raised while loading or validating a [`crate::ScanConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors returned by [`crate::ScanEngine`] operations.
///
/// None of these end a session; the engine stays usable after any of them.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    #[error("No reconstruction result is available")]
    NoResult,

    #[error("Camera does not support depth capture")]
    DepthUnsupported,

    #[error("Camera error: {0}")]
    Camera(#[from] StreamError),

    #[error("Failed to start reconstruction worker: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
}
