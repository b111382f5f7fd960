//! Module metadata aggregation.
//!
//! Enumerates every module under `modules/`, classifies it by kind and
//! lists the overlay files under `mods/` and `en-mods/`. Filtering by kind
//! is left to callers.

use packsmith_pack::MODULE_MANIFEST;
use packsmith_types::{ModuleDescriptor, ModuleKind, Platform};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ModulesError, ModulesResult};
use crate::tree::MODULES_DIR;

/// Overlay directories, relative to the tree root.
pub const MODS_DIR: &str = "mods";
pub const EN_MODS_DIR: &str = "en-mods";

/// Overlay files available in a tree, as tree-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayListing {
    pub mods: Vec<String>,
    pub en_mods: Vec<String>,
}

/// Snapshot of everything selectable in one source tree.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub platform: Platform,
    /// Sorted by kind, then identifier.
    pub modules: Vec<ModuleDescriptor>,
    pub overlays: OverlayListing,
    dirs: HashMap<(ModuleKind, String), PathBuf>,
}

impl Aggregation {
    pub fn by_kind(&self, kind: ModuleKind) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter().filter(move |m| m.kind == kind)
    }

    pub fn find(&self, name: &str, kind: ModuleKind) -> Option<&ModuleDescriptor> {
        self.by_kind(kind).find(|m| m.name == name)
    }

    /// Directory a module was loaded from.
    pub fn module_dir(&self, name: &str, kind: ModuleKind) -> Option<&Path> {
        self.dirs
            .get(&(kind, name.to_string()))
            .map(PathBuf::as_path)
    }
}

/// On-disk manifest format.
#[derive(Debug, Deserialize)]
struct ModuleManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: ModuleKind,
    #[serde(default)]
    description: String,
    #[serde(default)]
    author: Authors,
    #[serde(default)]
    contains: Vec<String>,
}

/// `author` is written either as one string or as a list.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum Authors {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl From<Authors> for Vec<String> {
    fn from(authors: Authors) -> Self {
        match authors {
            Authors::None => Vec::new(),
            Authors::One(a) => vec![a],
            Authors::Many(a) => a,
        }
    }
}

/// Scans a source tree.
///
/// A missing or unreadable `modules/` directory, or any malformed manifest,
/// fails the whole aggregation. Missing overlay directories are empty.
pub async fn aggregate(platform: Platform, root: &Path) -> ModulesResult<Aggregation> {
    let modules_dir = root.join(MODULES_DIR);
    let mut modules = Vec::new();
    let mut dirs = HashMap::new();

    for dir in list_dir(&modules_dir).await? {
        let manifest_path = dir.join(MODULE_MANIFEST);
        let data = match tokio::fs::read(&manifest_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Skipping {} without manifest", dir.display());
                continue;
            }
            Err(e) => return Err(ModulesError::io(&manifest_path, e)),
        };
        let manifest: ModuleManifest =
            serde_json::from_slice(&data).map_err(|source| ModulesError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        let name = match manifest.name {
            Some(name) => name,
            None => dir_name(&dir),
        };
        if dirs
            .insert((manifest.kind, name.clone()), dir.clone())
            .is_some()
        {
            return Err(ModulesError::Duplicate {
                kind: manifest.kind,
                name,
            });
        }

        modules.push(ModuleDescriptor {
            name,
            kind: manifest.kind,
            description: manifest.description,
            author: manifest.author.into(),
            contains: manifest.contains,
            platform,
        });
    }

    modules.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));

    let overlays = OverlayListing {
        mods: list_overlays(root, MODS_DIR).await?,
        en_mods: list_overlays(root, EN_MODS_DIR).await?,
    };

    debug!(
        "Aggregated {} {} modules from {}",
        modules.len(),
        platform,
        root.display()
    );

    Ok(Aggregation {
        platform,
        modules,
        overlays,
        dirs,
    })
}

/// Sorted subdirectories of `dir`.
async fn list_dir(dir: &Path) -> ModulesResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ModulesError::io(dir, e))?;
    let mut out = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ModulesError::io(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| ModulesError::io(entry.path(), e))?;
        if file_type.is_dir() && !entry.file_name().to_string_lossy().starts_with('.') {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

/// Sorted `<sub>/<file>` names; empty when the directory does not exist.
async fn list_overlays(root: &Path, sub: &str) -> ModulesResult<Vec<String>> {
    let dir = root.join(sub);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ModulesError::io(&dir, e)),
    };
    let mut out = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ModulesError::io(&dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            out.push(format!("{sub}/{name}"));
        }
    }
    out.sort();
    Ok(out)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
