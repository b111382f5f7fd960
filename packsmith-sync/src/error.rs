//! Error types for the sync layer.

use std::fmt;
use thiserror::Error;

use crate::vcs::CommandOutput;
use crate::webhook::SignatureCheck;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// One stage of a repository recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    RemoveIndexLock,
    ResetHard,
    Clean,
    Pull,
    MergeMappings,
    ReportStatus,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncStep::RemoveIndexLock => "index lock removal",
            SyncStep::ResetHard => "reset",
            SyncStep::Clean => "clean",
            SyncStep::Pull => "pull",
            SyncStep::MergeMappings => "mapping merge",
            SyncStep::ReportStatus => "status report",
        })
    }
}

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Webhook signature did not verify.
    #[error("signature verification failed: {0}")]
    Unauthorized(SignatureCheck),

    /// Webhook body could not be parsed.
    #[error("invalid webhook payload: {0}")]
    InvalidEvent(String),

    /// Webhook names a repository this service does not track.
    #[error("unknown repository: {0}")]
    UnknownRepository(String),

    /// A version-control command exited unsuccessfully.
    #[error("`{command}` failed ({status})")]
    Command {
        command: String,
        status: String,
        output: CommandOutput,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mapping merge error.
    #[error("mapping merge failed: {0}")]
    Modules(#[from] packsmith_modules::ModulesError),

    /// Network error talking to the deployment tracker.
    #[error("network error: {0}")]
    Network(String),

    /// A recovery step failed; carries everything captured before and during it.
    #[error("sync failed during {step}: {source}")]
    Step {
        step: SyncStep,
        transcript: String,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Captured command output, when the failure came from a sync step.
    pub fn transcript(&self) -> Option<&str> {
        match self {
            SyncError::Step { transcript, .. } => Some(transcript),
            _ => None,
        }
    }

    pub(crate) fn at(step: SyncStep, transcript: &str, source: SyncError) -> Self {
        SyncError::Step {
            step,
            transcript: transcript.to_string(),
            source: Box::new(source),
        }
    }
}
