//! On-disk source trees.

use std::path::{Component, Path, PathBuf};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ModulesError, ModulesResult};
use packsmith_pack::BASE_PACK_DIR;

/// Directory scanned for module manifests.
pub const MODULES_DIR: &str = "modules";

/// One checkout of a platform's source tree.
///
/// Builds only read the tree and syncs only write it, so the lock is a
/// readers-writer lock: every build holds a read guard from aggregation
/// until assembly finishes, a sync holds the write guard for the whole
/// recovery.
#[derive(Debug)]
pub struct SourceTree {
    root: PathBuf,
    lock: RwLock<()>,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modules_dir(&self) -> PathBuf {
        self.root.join(MODULES_DIR)
    }

    pub fn base_dir(&self) -> PathBuf {
        self.root.join(BASE_PACK_DIR)
    }

    /// Shared access for builds.
    pub async fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }

    /// Exclusive access for syncs.
    pub async fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().await
    }

    /// Resolves a tree-relative path to an existing file inside the tree.
    ///
    /// Absolute paths, `..` components that climb above the root and
    /// symlinks pointing outside the tree are rejected.
    pub async fn resolve_inside(&self, relative: &str) -> ModulesResult<PathBuf> {
        let normalized = normalize(relative)?;
        let joined = self.root.join(&normalized);

        let canonical = tokio::fs::canonicalize(&joined)
            .await
            .map_err(|_| ModulesError::PathNotFound(relative.to_string()))?;
        let canonical_root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|e| ModulesError::io(&self.root, e))?;

        if !canonical.starts_with(&canonical_root) {
            return Err(ModulesError::PathEscape(relative.to_string()));
        }
        let metadata = tokio::fs::metadata(&canonical)
            .await
            .map_err(|e| ModulesError::io(&canonical, e))?;
        if !metadata.is_file() {
            return Err(ModulesError::PathNotFound(relative.to_string()));
        }
        Ok(canonical)
    }
}

/// Lexically normalizes a relative path, failing if it leaves the root.
fn normalize(relative: &str) -> ModulesResult<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(ModulesError::PathEscape(relative.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ModulesError::PathEscape(relative.to_string()));
            }
        }
    }
    if parts.is_empty() {
        return Err(ModulesError::PathNotFound(relative.to_string()));
    }
    Ok(parts.iter().collect())
}
