//! Module descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Platform;

/// Classification of a selectable module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Content layered into the pack.
    Resource,
    /// A grouping directive that pulls in a set of resource modules.
    Collection,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Resource => f.write_str("resource"),
            ModuleKind::Collection => f.write_str("collection"),
        }
    }
}

/// A module as exposed to clients.
///
/// Loaded fresh from the source tree on every aggregation and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Identifier, unique within one platform and kind.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: Vec<String>,
    /// Resource modules pulled in by a collection. Empty for resources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,
    pub platform: Platform,
}
