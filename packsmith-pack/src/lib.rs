//! Artifact production for packsmith.
//!
//! - [`hash`]: SHA-256 content digests and the canonical
//!   `<brand>-<hash prefix>.<ext>` artifact name
//! - [`PackAssembler`]: the capability the build orchestrator calls to turn
//!   a resolved selection into bytes
//! - [`ZipAssembler`]: the reference assembler that layers directories from
//!   a source tree into a deterministic zip archive
//! - [`BuildLog`]: the ordered log handed back to clients
//!
//! Assembly must be deterministic: the artifact name is derived from the
//! output bytes, so two equal selections have to produce equal archives.

mod archive;
mod assembler;
mod error;
pub mod hash;
mod log;

pub use archive::{ZipAssembler, MODULE_MANIFEST};
pub use assembler::{
    Assembled, AssemblyInput, KeyMapping, LanguageFormat, OutputDirective, PackAssembler,
    ResolvedModule, BASE_PACK_DIR,
};
pub use error::{AssemblyError, AssemblyResult};
pub use hash::{artifact_name, digest, ArtifactRecord};
pub use log::BuildLog;
