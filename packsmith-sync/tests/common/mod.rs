#![allow(dead_code)]

use async_trait::async_trait;
use packsmith_modules::SourceTree;
use packsmith_sync::{
    CommandOutput, RepositoryHandle, SyncError, SyncResult, SyncStep, VersionControlClient,
};
use packsmith_types::Platform;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records every call and answers with canned output.
#[derive(Default)]
pub struct FakeVcs {
    calls: Mutex<Vec<(SyncStep, PathBuf)>>,
    fail_at: Mutex<Option<SyncStep>>,
}

impl FakeVcs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_at(step: SyncStep) -> Arc<Self> {
        let vcs = Self::default();
        *vcs.fail_at.lock().unwrap() = Some(step);
        Arc::new(vcs)
    }

    pub fn calls(&self) -> Vec<SyncStep> {
        self.calls.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn answer(&self, step: SyncStep, dir: &Path, stdout: &str) -> SyncResult<CommandOutput> {
        self.calls.lock().unwrap().push((step, dir.to_path_buf()));
        if *self.fail_at.lock().unwrap() == Some(step) {
            return Err(SyncError::Command {
                command: format!("git {step}"),
                status: "exit status: 1".to_string(),
                output: CommandOutput::new("", format!("fatal: {step} broke")),
            });
        }
        Ok(CommandOutput::new(stdout, ""))
    }
}

#[async_trait]
impl VersionControlClient for FakeVcs {
    async fn reset_hard(&self, dir: &Path) -> SyncResult<CommandOutput> {
        self.answer(SyncStep::ResetHard, dir, "HEAD is now at 1a2b3c4 update\n")
    }

    async fn clean(&self, dir: &Path) -> SyncResult<CommandOutput> {
        self.answer(SyncStep::Clean, dir, "")
    }

    async fn pull(&self, dir: &Path) -> SyncResult<CommandOutput> {
        self.answer(SyncStep::Pull, dir, "Already up to date.\n")
    }
}

/// A checkout-shaped directory with a `.git/index`.
pub fn checkout() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".git/index"), b"DIRC").unwrap();
    std::fs::create_dir_all(dir.path().join("modules")).unwrap();
    dir
}

pub fn write(root: &Path, rel: &str, data: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

pub fn handle(name: &str, root: &Path, vcs: Arc<FakeVcs>) -> Arc<RepositoryHandle> {
    Arc::new(RepositoryHandle::new(
        name,
        Platform::Java,
        Arc::new(SourceTree::new(root)),
        vcs,
    ))
}
