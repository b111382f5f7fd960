//! Artifact object stores for packsmith.
//!
//! [`ArtifactStore`] is the one seam the build orchestrator publishes
//! through. Two implementations ship:
//! - [`S3ArtifactStore`] for S3 and S3-compatible buckets
//! - [`MemoryArtifactStore`] for tests and local runs
//!
//! The existence check and the write are separate calls and not atomic. Two
//! builds producing identical bytes may both see "absent" and both upload;
//! the payloads are identical, so the second write is redundant, not wrong.

mod error;
mod memory;
mod s3;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryArtifactStore;
pub use s3::{S3ArtifactStore, S3Config};
pub use store::ArtifactStore;
