//! Target platforms and execution environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A game-client ecosystem the service packages for.
///
/// Each platform owns its own source tree, repository handle and
/// assembler; nothing is shared between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Java,
    Bedrock,
}

impl Platform {
    /// All platforms, in response order.
    pub const ALL: [Platform; 2] = [Platform::Java, Platform::Bedrock];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Platform::Java => "java",
            Platform::Bedrock => "bedrock",
        }
    }

    /// Artifact extension used when a request names none.
    #[must_use]
    pub const fn default_extension(&self) -> &'static str {
        match self {
            Platform::Java => "zip",
            Platform::Bedrock => "mcpack",
        }
    }

    /// Extensions a request may ask for on this platform.
    #[must_use]
    pub const fn supported_extensions(&self) -> &'static [&'static str] {
        match self {
            Platform::Java => &["zip"],
            Platform::Bedrock => &["mcpack", "zip"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "java" | "je" => Ok(Platform::Java),
            "bedrock" | "be" => Ok(Platform::Bedrock),
            other => Err(Error::UnknownPlatform(other.to_string())),
        }
    }
}

/// Execution environment of the running service.
///
/// Controls how strictly inbound webhooks are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => f.write_str("production"),
            Environment::Development => f.write_str("development"),
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" => Ok(Environment::Development),
            other => Err(Error::UnknownEnvironment(other.to_string())),
        }
    }
}
