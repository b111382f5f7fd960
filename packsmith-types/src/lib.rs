//! Core type definitions for packsmith.
//!
//! This crate defines the plain data shared by every other crate in the
//! workspace:
//! - Target platforms and the execution environment
//! - Module descriptors as read from a source tree
//! - Build requests as accepted by the build orchestrator
//!
//! Nothing here performs I/O.

mod module;
mod platform;
mod request;

pub use module::{ModuleDescriptor, ModuleKind};
pub use platform::{Environment, Platform};
pub use request::{BuildRequest, BuildType, ModuleSelection};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when parsing or checking type values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown build type: {0}")]
    UnknownBuildType(String),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("build type {build_type} is not supported on {platform}")]
    UnsupportedBuildType {
        platform: Platform,
        build_type: BuildType,
    },

    #[error("extension {extension:?} is not supported on {platform}")]
    UnsupportedExtension {
        platform: Platform,
        extension: String,
    },
}
