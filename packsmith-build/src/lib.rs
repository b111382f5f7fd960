//! Build orchestration for packsmith.
//!
//! A [`BuildOrchestrator`] owns one platform's source tree and assembler and
//! shares the artifact store. A build:
//!
//! 1. validates the request against a fresh aggregation of the tree,
//! 2. resolves overlay paths, rejecting anything outside the tree,
//! 3. assembles under the tree's read guard,
//! 4. hashes and names the result, then uploads unless the store already
//!    has it.
//!
//! Every step is written to the returned build log. Failures carry the log
//! up to the failing step.

mod error;
mod orchestrator;

pub use error::{ArtifactSummary, BuildError, BuildFailure, BuildResult};
pub use orchestrator::{BuildOrchestrator, BuildOutcome, DEFAULT_EXISTENCE_ATTEMPTS};
