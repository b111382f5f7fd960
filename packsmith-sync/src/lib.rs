//! Webhook-driven source tree synchronization for packsmith.
//!
//! # Components
//!
//! - **Webhook**: HMAC-SHA256 verification of inbound deliveries
//! - **VersionControlClient**: the git operations a recovery needs
//! - **RepositoryHandle**: one tracked checkout and its status
//! - **DeploymentReporter**: posts success or failure to the upstream tracker
//! - **SyncCoordinator**: ties the above together per delivery
//!
//! ## Recovery
//!
//! 1. Remove a stale `.git/index.lock`
//! 2. Hard reset to the upstream ref
//! 3. Remove untracked files
//! 4. Pull
//! 5. Regenerate the merged legacy mapping
//! 6. Report the deployment status
//!
//! Steps 1 to 5 run under the tree's write guard.

mod coordinator;
mod deployment;
mod error;
mod repository;
pub mod vcs;
pub mod webhook;

pub use coordinator::{SyncCoordinator, SyncOutcome};
pub use deployment::{DeploymentReporter, DeploymentState};
pub use error::{SyncError, SyncResult, SyncStep};
pub use repository::{RepositoryHandle, RepositoryStatus, SyncReport};
pub use vcs::{CommandOutput, GitCli, VersionControlClient};
pub use webhook::{SignatureCheck, WebhookAuthenticator, WebhookEvent, SIGNATURE_HEADER};
