//! Version-control capability.
//!
//! The repository handle only needs three operations. Modelling them as a
//! trait keeps the recovery state machine testable without a checkout.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Captured output of one version-control command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Stdout followed by stderr, for transcripts.
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

#[async_trait]
pub trait VersionControlClient: Send + Sync {
    /// Discards local modifications, resetting to the upstream tracking ref.
    async fn reset_hard(&self, dir: &Path) -> SyncResult<CommandOutput>;

    /// Removes untracked files and directories.
    async fn clean(&self, dir: &Path) -> SyncResult<CommandOutput>;

    /// Fetches and merges the upstream state.
    async fn pull(&self, dir: &Path) -> SyncResult<CommandOutput>;
}

/// Runs the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific git executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, dir: &Path, args: &[&str]) -> SyncResult<CommandOutput> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!("Running `{}` in {}", command, dir.display());

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await?;

        let captured = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if output.status.success() {
            Ok(captured)
        } else {
            Err(SyncError::Command {
                command,
                status: output.status.to_string(),
                output: captured,
            })
        }
    }
}

#[async_trait]
impl VersionControlClient for GitCli {
    async fn reset_hard(&self, dir: &Path) -> SyncResult<CommandOutput> {
        self.run(dir, &["reset", "--hard", "@{u}"]).await
    }

    async fn clean(&self, dir: &Path) -> SyncResult<CommandOutput> {
        self.run(dir, &["clean", "-df"]).await
    }

    async fn pull(&self, dir: &Path) -> SyncResult<CommandOutput> {
        self.run(dir, &["pull"]).await
    }
}
