//! Sync coordinator: authenticates webhook deliveries and dispatches them to
//! the matching repository.

use packsmith_types::Environment;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::deployment::{DeploymentReporter, DeploymentState};
use crate::error::{SyncError, SyncResult, SyncStep};
use crate::repository::RepositoryHandle;
use crate::webhook::{SignatureCheck, WebhookAuthenticator, WebhookEvent};

/// Response to a handled delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub stdout: String,
    pub dir: String,
    #[serde(skip)]
    pub repository: String,
}

#[derive(Debug)]
pub struct SyncCoordinator {
    authenticator: WebhookAuthenticator,
    environment: Environment,
    repositories: HashMap<String, Arc<RepositoryHandle>>,
    reporter: Option<DeploymentReporter>,
}

impl SyncCoordinator {
    pub fn new(authenticator: WebhookAuthenticator, environment: Environment) -> Self {
        Self {
            authenticator,
            environment,
            repositories: HashMap::new(),
            reporter: None,
        }
    }

    /// Tracks a repository under its upstream name.
    pub fn with_repository(mut self, handle: Arc<RepositoryHandle>) -> Self {
        self.repositories.insert(handle.name().to_string(), handle);
        self
    }

    pub fn with_reporter(mut self, reporter: DeploymentReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn repository(&self, name: &str) -> Option<&Arc<RepositoryHandle>> {
        self.repositories.get(name)
    }

    /// Handles one delivery: verify, route, resync, report.
    ///
    /// A bad signature is rejected before anything touches a tree, unless
    /// running in development where it is only logged.
    pub async fn handle(&self, raw: &[u8], signature: Option<&str>) -> SyncResult<SyncOutcome> {
        let check = self.authenticator.check(raw, signature);
        if check != SignatureCheck::Valid {
            if self.environment.is_production() {
                warn!("Rejected webhook delivery: {}", check);
                return Err(SyncError::Unauthorized(check));
            }
            warn!("Webhook signature {} ignored outside production", check);
        }

        let event = WebhookEvent::parse(raw)?;
        let repository = self
            .repositories
            .get(&event.repository)
            .ok_or_else(|| SyncError::UnknownRepository(event.repository.clone()))?;
        info!("Webhook for {} accepted", repository.name());

        let report = match repository.resync().await {
            Ok(report) => report,
            Err(e) => {
                self.report(event.statuses_url.as_deref(), DeploymentState::Failure)
                    .await
                    .unwrap_or_else(|err| warn!("Failure status not delivered: {}", err));
                return Err(e);
            }
        };

        self.report(event.statuses_url.as_deref(), DeploymentState::Success)
            .await
            .map_err(|e| SyncError::at(SyncStep::ReportStatus, &report.transcript, e))?;

        Ok(SyncOutcome {
            stdout: report.transcript,
            dir: repository.tree().root().display().to_string(),
            repository: repository.name().to_string(),
        })
    }

    async fn report(&self, statuses_url: Option<&str>, state: DeploymentState) -> SyncResult<()> {
        match (statuses_url, &self.reporter) {
            (Some(url), Some(reporter)) => reporter.report(url, state).await,
            (Some(_), None) => {
                warn!("Deployment status requested but no token is configured");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
