//! Build error types.

use packsmith_modules::ModulesError;
use packsmith_pack::AssemblyError;
use packsmith_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Result type for build steps.
pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    /// The request names something the tree does not have, or asks for an
    /// output the platform does not produce.
    #[error("invalid build request: {0}")]
    Validation(String),

    /// The source tree could not be read.
    #[error(transparent)]
    Modules(#[from] ModulesError),

    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    /// Writing to the artifact store failed. Existence-check failures never
    /// end up here; they fall through to an upload.
    #[error("artifact upload failed: {0}")]
    Store(#[from] StoreError),
}

impl From<packsmith_types::Error> for BuildError {
    fn from(e: packsmith_types::Error) -> Self {
        BuildError::Validation(e.to_string())
    }
}

/// Identity of a built artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub name: String,
    pub checksum: String,
    pub size: u64,
}

/// A failed build: the error, the log up to the failure, and the artifact
/// identity when bytes had already been produced.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct BuildFailure {
    #[source]
    pub error: BuildError,
    pub log: String,
    /// Set when the archive was built but could not be published.
    pub artifact: Option<ArtifactSummary>,
}
