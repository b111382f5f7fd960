//! Error types for module aggregation.

use packsmith_types::ModuleKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for aggregation operations.
pub type ModulesResult<T> = Result<T, ModulesError>;

#[derive(Debug, Error)]
pub enum ModulesError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid module manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid mapping file {path}: {reason}")]
    Mapping { path: PathBuf, reason: String },

    #[error("duplicate {kind} module {name}")]
    Duplicate { kind: ModuleKind, name: String },

    #[error("path {0:?} escapes the source tree")]
    PathEscape(String),

    #[error("path {0:?} does not exist in the source tree")]
    PathNotFound(String),
}

impl ModulesError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModulesError::Io {
            path: path.into(),
            source,
        }
    }
}
