//! Content hashing and artifact naming.
//!
//! Artifacts are content-addressed: the public name is derived from the
//! SHA-256 of the bytes, so identical builds collapse onto one object.

use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters of the digest kept in an artifact name.
pub const NAME_HASH_LEN: usize = 6;

/// Computes the lowercase hex SHA-256 digest of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Canonical artifact name: `<brand>-<first 6 hex chars>.<extension>`.
pub fn artifact_name(brand: &str, checksum: &str, extension: &str) -> String {
    let prefix = checksum.get(..NAME_HASH_LEN).unwrap_or(checksum);
    format!("{brand}-{prefix}.{extension}")
}

/// A built artifact ready to publish.
#[derive(Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Full hex SHA-256 of `bytes`.
    pub checksum: String,
    /// Canonical, content-derived object name.
    pub name: String,
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl ArtifactRecord {
    /// Hashes `bytes` and derives the canonical name.
    pub fn new(brand: &str, extension: &str, bytes: Vec<u8>) -> Self {
        let checksum = digest(&bytes);
        let name = artifact_name(brand, &checksum, extension);
        Self {
            checksum,
            name,
            size: bytes.len() as u64,
            bytes,
        }
    }

    /// MIME type used when uploading. Both `.zip` and `.mcpack` are zip archives.
    pub fn content_type(&self) -> &'static str {
        "application/zip"
    }
}

impl fmt::Debug for ArtifactRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactRecord")
            .field("checksum", &self.checksum)
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
