//! Artifact store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur talking to the object store.
///
/// A confirmed "object not found" is never an error: `exists` returns
/// `Ok(false)` for it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("S3 operation failed: {0}")]
    S3(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected our credentials or bucket policy.
    #[error("access denied: {0}")]
    Denied(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true for failures worth retrying (transport, throttling).
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::S3(_) | StoreError::Unavailable(_))
    }
}
