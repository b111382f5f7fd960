//! Build requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Platform, Result};

/// Output flavour of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Platform default language file.
    #[default]
    Normal,
    /// Language file name understood by older clients.
    #[serde(alias = "compat")]
    Compatible,
    /// Java only: keys rewritten through the legacy mapping, `.lang` output.
    Legacy,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildType::Normal => f.write_str("normal"),
            BuildType::Compatible => f.write_str("compatible"),
            BuildType::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for BuildType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(BuildType::Normal),
            "compatible" | "compat" => Ok(BuildType::Compatible),
            "legacy" => Ok(BuildType::Legacy),
            other => Err(Error::UnknownBuildType(other.to_string())),
        }
    }
}

/// Module identifiers chosen by the client, partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSelection {
    #[serde(default)]
    pub resource: Vec<String>,
    #[serde(default)]
    pub collection: Vec<String>,
}

impl ModuleSelection {
    pub fn new<R, C>(resource: R, collection: C) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            resource: resource.into_iter().map(Into::into).collect(),
            collection: collection.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a copy with each list sorted and deduplicated, so that two
    /// selections naming the same modules in a different order compare equal.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let sort = |ids: &[String]| {
            ids.iter()
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>()
        };
        Self {
            resource: sort(&self.resource),
            collection: sort(&self.collection),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resource.is_empty() && self.collection.is_empty()
    }
}

/// A request to build one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub platform: Platform,
    #[serde(rename = "type")]
    pub build_type: BuildType,
    #[serde(default)]
    pub modules: ModuleSelection,
    /// Overlay files, relative to the platform source tree.
    #[serde(default)]
    pub overlays: Vec<String>,
    /// Requested pack format version (Java).
    #[serde(default)]
    pub format: Option<u32>,
    #[serde(default)]
    pub extension: Option<String>,
}

impl BuildRequest {
    pub fn new(platform: Platform, build_type: BuildType, modules: ModuleSelection) -> Self {
        Self {
            platform,
            build_type,
            modules,
            overlays: Vec::new(),
            format: None,
            extension: None,
        }
    }

    pub fn java(build_type: BuildType, modules: ModuleSelection) -> Self {
        Self::new(Platform::Java, build_type, modules)
    }

    pub fn bedrock(build_type: BuildType, modules: ModuleSelection) -> Self {
        Self::new(Platform::Bedrock, build_type, modules)
    }

    pub fn with_overlays<I, S>(mut self, overlays: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overlays = overlays.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_format(mut self, format: u32) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Checks the parts of the request that do not need the source tree:
    /// the build type is available on the platform and the extension is one
    /// the platform produces. Returns the resolved extension.
    pub fn check_shape(&self) -> Result<&'static str> {
        if self.build_type == BuildType::Legacy && self.platform != Platform::Java {
            return Err(Error::UnsupportedBuildType {
                platform: self.platform,
                build_type: self.build_type,
            });
        }

        match self.extension.as_deref() {
            None => Ok(self.platform.default_extension()),
            Some(requested) => self
                .platform
                .supported_extensions()
                .iter()
                .copied()
                .find(|ext| ext.eq_ignore_ascii_case(requested.trim_start_matches('.')))
                .ok_or_else(|| Error::UnsupportedExtension {
                    platform: self.platform,
                    extension: requested.to_string(),
                }),
        }
    }
}
