//! Artifact store abstraction.

use async_trait::async_trait;

use crate::error::StoreResult;

/// Object store keyed by artifact name.
///
/// Names are content-derived, so writing the same name twice stores the same
/// bytes and `put` is idempotent from the caller's point of view. After a
/// successful `put`, `exists` for that name returns true within the store's
/// own consistency window.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Returns the name of the store backend.
    fn provider_name(&self) -> &'static str;

    /// Public download root that clients prefix to artifact names.
    fn public_root(&self) -> &str;

    /// Download URL of an artifact: the public root followed by the name.
    fn public_url(&self, name: &str) -> String {
        let root = self.public_root();
        if root.is_empty() || root.ends_with('/') {
            format!("{root}{name}")
        } else {
            format!("{root}/{name}")
        }
    }

    /// `Ok(false)` only when the store confirmed the object is absent.
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Writes an object.
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()>;
}
