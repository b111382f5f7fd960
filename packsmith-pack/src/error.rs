//! Error types for the pack crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for assembly operations.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("base pack not found at {0}")]
    MissingBase(PathBuf),

    #[error("module directory not found: {0}")]
    MissingModule(PathBuf),

    #[error("overlay file {0} is not a flat string map")]
    InvalidOverlay(PathBuf),

    #[error("assembler task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Other(String),
}
