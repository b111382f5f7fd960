//! Deployment status callbacks.

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

const USER_AGENT: &str = concat!("packsmith/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

/// State reported to the deployment tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    Success,
    Failure,
}

#[derive(Serialize)]
struct StatusBody {
    state: DeploymentState,
}

/// Posts deployment statuses with a bearer token.
#[derive(Clone)]
pub struct DeploymentReporter {
    client: Client,
    token: String,
}

impl std::fmt::Debug for DeploymentReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentReporter")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl DeploymentReporter {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), token)
    }

    pub fn with_client(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }

    pub async fn report(&self, statuses_url: &str, state: DeploymentState) -> SyncResult<()> {
        debug!("Reporting deployment {:?} to {}", state, statuses_url);
        let resp = self
            .client
            .post(statuses_url)
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .json(&StatusBody { state })
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Network(format!(
                "status callback returned {status}: {body}"
            )));
        }
        Ok(())
    }
}
