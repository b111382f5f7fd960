//! Repository handle: one synchronized source tree and its recovery state
//! machine (`Synced → Resyncing → Synced | Failed`).

use chrono::{DateTime, Utc};
use packsmith_modules::{has_mappings, merge_mappings, SourceTree};
use packsmith_types::Platform;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult, SyncStep};
use crate::vcs::{CommandOutput, VersionControlClient};

const GIT_DIR: &str = ".git";
const INDEX_FILE: &str = "index";
const INDEX_LOCK_FILE: &str = "index.lock";

/// Synchronization status of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryStatus {
    Synced,
    Resyncing,
    Failed,
}

/// Result of a successful recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Captured output of every command, in order.
    pub transcript: String,
    /// Number of merged legacy mappings, when the tree carries any.
    pub mapping_entries: Option<usize>,
}

/// A named upstream repository checked out into a [`SourceTree`].
pub struct RepositoryHandle {
    name: String,
    platform: Platform,
    tree: Arc<SourceTree>,
    vcs: Arc<dyn VersionControlClient>,
    status: RwLock<RepositoryStatus>,
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("name", &self.name)
            .field("platform", &self.platform)
            .field("root", &self.tree.root())
            .finish_non_exhaustive()
    }
}

impl RepositoryHandle {
    pub fn new(
        name: impl Into<String>,
        platform: Platform,
        tree: Arc<SourceTree>,
        vcs: Arc<dyn VersionControlClient>,
    ) -> Self {
        Self {
            name: name.into(),
            platform,
            tree,
            vcs,
            status: RwLock::new(RepositoryStatus::Synced),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn tree(&self) -> &Arc<SourceTree> {
        &self.tree
    }

    pub async fn status(&self) -> RepositoryStatus {
        *self.status.read().await
    }

    /// Modification time of the version-control index, if it exists.
    pub async fn last_synced(&self) -> Option<DateTime<Utc>> {
        let path = self.tree.root().join(GIT_DIR).join(INDEX_FILE);
        let modified = tokio::fs::metadata(&path).await.ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Milliseconds since the epoch of [`Self::last_synced`]; 0 when unknown.
    pub async fn last_synced_millis(&self) -> i64 {
        self.last_synced()
            .await
            .map(|t| t.timestamp_millis())
            .unwrap_or(0)
    }

    /// Brings the working tree back to the upstream state.
    ///
    /// Holds the tree's write guard for the whole attempt, so it waits for
    /// in-flight builds and blocks new ones. A failing step aborts the
    /// attempt with everything captured so far; nothing is rolled back.
    pub async fn resync(&self) -> SyncResult<SyncReport> {
        let _guard = self.tree.write().await;
        self.set_status(RepositoryStatus::Resyncing).await;
        info!("Resyncing {} ({})", self.name, self.tree.root().display());

        let result = self.run_steps().await;
        match &result {
            Ok(_) => {
                self.set_status(RepositoryStatus::Synced).await;
                info!("Repository {} synced", self.name);
            }
            Err(e) => {
                self.set_status(RepositoryStatus::Failed).await;
                warn!("Repository {} failed to sync: {}", self.name, e);
            }
        }
        result
    }

    async fn run_steps(&self) -> SyncResult<SyncReport> {
        let root = self.tree.root();
        let mut transcript = String::new();

        let lock = root.join(GIT_DIR).join(INDEX_LOCK_FILE);
        if let Err(e) = remove_index_lock(&lock).await {
            append_line(
                &mut transcript,
                &format!("Could not remove {}: {e}", lock.display()),
            );
            return Err(SyncError::at(SyncStep::RemoveIndexLock, &transcript, e));
        }

        for step in [SyncStep::ResetHard, SyncStep::Clean, SyncStep::Pull] {
            let output = match step {
                SyncStep::ResetHard => self.vcs.reset_hard(root).await,
                SyncStep::Clean => self.vcs.clean(root).await,
                _ => self.vcs.pull(root).await,
            };
            match output {
                Ok(output) => append(&mut transcript, &output),
                Err(e) => {
                    if let SyncError::Command { output, .. } = &e {
                        append(&mut transcript, output);
                    }
                    return Err(SyncError::at(step, &transcript, e));
                }
            }
        }

        let mapping_entries = if has_mappings(root).await {
            let merged = merge_mappings(root)
                .await
                .map_err(|e| SyncError::at(SyncStep::MergeMappings, &transcript, e.into()))?;
            append_line(
                &mut transcript,
                &format!("Merged {} legacy mappings.", merged.len()),
            );
            Some(merged.len())
        } else {
            None
        };

        Ok(SyncReport {
            transcript,
            mapping_entries,
        })
    }

    async fn set_status(&self, status: RepositoryStatus) {
        *self.status.write().await = status;
    }
}

async fn remove_index_lock(path: &Path) -> SyncResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn append(transcript: &mut String, output: &CommandOutput) {
    let combined = output.combined();
    if !combined.is_empty() {
        append_line(transcript, &combined);
    }
}

fn append_line(transcript: &mut String, line: &str) {
    if !transcript.is_empty() {
        transcript.push('\n');
    }
    transcript.push_str(line);
}
