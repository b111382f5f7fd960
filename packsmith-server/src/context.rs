//! Application context, built once at startup and shared with every handler.

use packsmith_build::BuildOrchestrator;
use packsmith_modules::{has_mappings, merge_mappings, SourceTree};
use packsmith_pack::ZipAssembler;
use packsmith_store::{ArtifactStore, MemoryArtifactStore, S3ArtifactStore};
use packsmith_sync::{
    DeploymentReporter, GitCli, RepositoryHandle, SyncCoordinator, VersionControlClient,
    WebhookAuthenticator,
};
use packsmith_types::Platform;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ServerConfig, StoreBackend};
use crate::error::ServerError;

/// Everything one platform owns.
#[derive(Debug)]
pub struct PlatformContext {
    pub orchestrator: BuildOrchestrator,
    pub repository: Arc<RepositoryHandle>,
}

#[derive(Debug)]
pub struct AppContext {
    pub java: PlatformContext,
    pub bedrock: PlatformContext,
    pub coordinator: SyncCoordinator,
}

impl AppContext {
    /// Connects the configured store and wires both platforms to the git CLI.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let store: Arc<dyn ArtifactStore> = match config.store {
            StoreBackend::S3 => Arc::new(S3ArtifactStore::connect(config.s3.clone()).await?),
            StoreBackend::Memory => {
                warn!("Using the in-memory artifact store; artifacts are not persisted");
                Arc::new(MemoryArtifactStore::new(config.s3.public_root.clone()))
            }
        };
        Ok(Self::new(config, store, Arc::new(GitCli::new())))
    }

    /// Wires the context from explicit capabilities.
    pub fn new(
        config: &ServerConfig,
        store: Arc<dyn ArtifactStore>,
        vcs: Arc<dyn VersionControlClient>,
    ) -> Self {
        let platform = |platform: Platform, repo: &str, root: PathBuf| {
            let tree = Arc::new(SourceTree::new(root));
            let orchestrator = BuildOrchestrator::new(
                config.brand.clone(),
                platform,
                Arc::clone(&tree),
                Arc::new(ZipAssembler::new()),
                Arc::clone(&store),
            )
            .with_existence_attempts(config.existence_attempts);
            let repository = Arc::new(RepositoryHandle::new(
                repo,
                platform,
                tree,
                Arc::clone(&vcs),
            ));
            PlatformContext {
                orchestrator,
                repository,
            }
        };
        let java = platform(Platform::Java, &config.java_repo, config.java_root());
        let bedrock = platform(Platform::Bedrock, &config.bedrock_repo, config.bedrock_root());

        let mut coordinator = SyncCoordinator::new(
            WebhookAuthenticator::new(config.webhook_secret.clone()),
            config.environment,
        )
        .with_repository(Arc::clone(&java.repository))
        .with_repository(Arc::clone(&bedrock.repository));
        if let Some(token) = &config.gh_token {
            coordinator = coordinator.with_reporter(DeploymentReporter::new(token.clone()));
        }

        Self {
            java,
            bedrock,
            coordinator,
        }
    }

    pub fn platform(&self, platform: Platform) -> &PlatformContext {
        match platform {
            Platform::Java => &self.java,
            Platform::Bedrock => &self.bedrock,
        }
    }

    /// Regenerates merged legacy mappings for every tree that has them.
    /// Failures are logged; builds fall back to merging in memory.
    pub async fn merge_mappings(&self) {
        for platform in Platform::ALL {
            let tree = self.platform(platform).orchestrator.tree();
            let _guard = tree.write().await;
            if !has_mappings(tree.root()).await {
                continue;
            }
            match merge_mappings(tree.root()).await {
                Ok(merged) => info!("{} mappings ready ({} entries)", platform, merged.len()),
                Err(e) => warn!("Could not merge {} mappings: {}", platform, e),
            }
        }
    }
}
