//! The build pipeline.

use packsmith_modules::{aggregate, load_mapping, Aggregation, SourceTree};
use packsmith_pack::{
    ArtifactRecord, AssemblyInput, BuildLog, OutputDirective, PackAssembler, ResolvedModule,
};
use packsmith_store::ArtifactStore;
use packsmith_types::{BuildRequest, BuildType, ModuleKind, Platform};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{ArtifactSummary, BuildError, BuildFailure, BuildResult};

/// Default number of existence checks before uploading blind.
pub const DEFAULT_EXISTENCE_ATTEMPTS: u32 = 3;

/// A successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub artifact: ArtifactSummary,
    /// Newline-joined build log.
    pub log: String,
    /// False when the store already held the artifact.
    pub uploaded: bool,
}

/// Runs builds for one platform's source tree.
pub struct BuildOrchestrator {
    brand: String,
    platform: Platform,
    tree: Arc<SourceTree>,
    assembler: Arc<dyn PackAssembler>,
    store: Arc<dyn ArtifactStore>,
    existence_attempts: u32,
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("brand", &self.brand)
            .field("platform", &self.platform)
            .field("root", &self.tree.root())
            .field("store", &self.store.provider_name())
            .field("existence_attempts", &self.existence_attempts)
            .finish()
    }
}

impl BuildOrchestrator {
    pub fn new(
        brand: impl Into<String>,
        platform: Platform,
        tree: Arc<SourceTree>,
        assembler: Arc<dyn PackAssembler>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            brand: brand.into(),
            platform,
            tree,
            assembler,
            store,
            existence_attempts: DEFAULT_EXISTENCE_ATTEMPTS,
        }
    }

    /// Sets how many times a failing existence check is retried. At least one
    /// check is always made.
    pub fn with_existence_attempts(mut self, attempts: u32) -> Self {
        self.existence_attempts = attempts.max(1);
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn tree(&self) -> &Arc<SourceTree> {
        &self.tree
    }

    pub fn public_root(&self) -> &str {
        self.store.public_root()
    }

    /// Current module metadata, read under the tree's read guard.
    pub async fn modules(&self) -> BuildResult<Aggregation> {
        let _guard = self.tree.read().await;
        Ok(aggregate(self.platform, self.tree.root()).await?)
    }

    /// Builds and publishes one artifact.
    pub async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome, BuildFailure> {
        let build_id = Uuid::now_v7();
        let span = info_span!("build", id = %build_id, platform = %self.platform);

        async move {
            let mut log = BuildLog::new();
            let mut artifact = None;
            match self.run(request, &mut log, &mut artifact).await {
                Ok((artifact, uploaded)) => {
                    note(&mut log, "Build finished.");
                    Ok(BuildOutcome {
                        artifact,
                        log: log.render(),
                        uploaded,
                    })
                }
                Err(error) => {
                    warn!("Build failed: {}", error);
                    log.push(format!("Build failed: {error}"));
                    Err(BuildFailure {
                        error,
                        log: log.render(),
                        artifact,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &BuildRequest,
        log: &mut BuildLog,
        artifact: &mut Option<ArtifactSummary>,
    ) -> BuildResult<(ArtifactSummary, bool)> {
        if request.platform != self.platform {
            return Err(BuildError::Validation(format!(
                "{} request sent to the {} builder",
                request.platform, self.platform
            )));
        }
        let selection = request.modules.normalized();
        note(
            log,
            format!(
                "Received {} {} build: resource [{}], collection [{}], overlays [{}], format {}.",
                request.build_type,
                request.platform,
                selection.resource.join(", "),
                selection.collection.join(", "),
                request.overlays.join(", "),
                request
                    .format
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "default".into()),
            ),
        );
        let extension = request.check_shape()?;
        if self.platform == Platform::Bedrock && !request.overlays.is_empty() {
            return Err(BuildError::Validation(
                "overlays are only available on java".into(),
            ));
        }

        let guard = self.tree.read().await;
        let root = self.tree.root();
        let aggregation = aggregate(self.platform, root).await?;

        let enabled = expand(&aggregation, &selection.resource, &selection.collection)?;
        if enabled.is_empty() {
            note(log, "No modules enabled; building the base pack only.");
        } else {
            note(
                log,
                format!(
                    "Enabled modules: {}.",
                    enabled.iter().cloned().collect::<Vec<_>>().join(", ")
                ),
            );
        }
        let modules = enabled
            .iter()
            .map(|name| {
                aggregation
                    .module_dir(name, ModuleKind::Resource)
                    .map(|dir| ResolvedModule {
                        name: name.clone(),
                        dir: dir.to_path_buf(),
                    })
                    .ok_or_else(|| BuildError::Validation(format!("unknown module {name}")))
            })
            .collect::<BuildResult<Vec<_>>>()?;

        let mut overlays: Vec<PathBuf> = Vec::new();
        let mut seen = BTreeSet::new();
        for overlay in &request.overlays {
            if !seen.insert(overlay.as_str()) {
                continue;
            }
            let path = self
                .tree
                .resolve_inside(overlay)
                .await
                .map_err(|e| BuildError::Validation(e.to_string()))?;
            overlays.push(path);
        }

        let mapping = match request.build_type {
            BuildType::Legacy => Some(load_mapping(root).await?),
            _ => None,
        };
        let directive =
            OutputDirective::new(self.platform, request.build_type, mapping, request.format)
                .ok_or_else(|| {
                    BuildError::Validation(format!(
                        "{} builds are not available on {}",
                        request.build_type, self.platform
                    ))
                })?;

        let input = AssemblyInput {
            platform: self.platform,
            base: self.tree.base_dir(),
            modules,
            overlays,
            directive,
        };
        let assembled = self.assembler.assemble(input).await?;
        drop(guard);

        for line in assembled.log {
            note(log, line);
        }

        let record = ArtifactRecord::new(&self.brand, extension, assembled.bytes);
        note(
            log,
            format!(
                "Built {} ({} bytes, sha256 {}).",
                record.name, record.size, record.checksum
            ),
        );
        let summary = ArtifactSummary {
            name: record.name.clone(),
            checksum: record.checksum.clone(),
            size: record.size,
        };
        *artifact = Some(summary.clone());

        if self.already_published(&record.name, log).await {
            note(log, format!("{} is already published; skipping upload.", record.name));
            return Ok((summary, false));
        }

        let content_type = record.content_type();
        self.store
            .put(&record.name, record.bytes, content_type)
            .await?;
        note(
            log,
            format!("Uploaded {} to {}.", summary.name, self.store.public_url(&summary.name)),
        );
        Ok((summary, true))
    }

    /// True only when the store confirms the object exists. Transient
    /// failures are retried; when no check succeeds the answer is false and
    /// the caller uploads.
    async fn already_published(&self, name: &str, log: &mut BuildLog) -> bool {
        for attempt in 1..=self.existence_attempts {
            match self.store.exists(name).await {
                Ok(exists) => return exists,
                Err(e) => {
                    warn!(
                        "Existence check {}/{} for {} failed: {}",
                        attempt, self.existence_attempts, name, e
                    );
                    log.push(format!(
                        "Existence check {attempt}/{} failed: {e}",
                        self.existence_attempts
                    ));
                    if !e.is_transient() {
                        break;
                    }
                }
            }
        }
        note(log, "Could not confirm whether the artifact exists; uploading anyway.");
        false
    }
}

/// Resolves the selection to a sorted set of resource module names.
fn expand(
    aggregation: &Aggregation,
    resources: &[String],
    collections: &[String],
) -> BuildResult<BTreeSet<String>> {
    let mut enabled = BTreeSet::new();
    for name in resources {
        if aggregation.find(name, ModuleKind::Resource).is_none() {
            return Err(unknown(name, ModuleKind::Resource, aggregation));
        }
        enabled.insert(name.clone());
    }
    for name in collections {
        let collection = aggregation
            .find(name, ModuleKind::Collection)
            .ok_or_else(|| unknown(name, ModuleKind::Collection, aggregation))?;
        for member in &collection.contains {
            if aggregation.find(member, ModuleKind::Resource).is_none() {
                return Err(BuildError::Validation(format!(
                    "collection {name} contains unknown resource module {member}"
                )));
            }
            enabled.insert(member.clone());
        }
    }
    Ok(enabled)
}

fn unknown(name: &str, kind: ModuleKind, aggregation: &Aggregation) -> BuildError {
    let other = match kind {
        ModuleKind::Resource => ModuleKind::Collection,
        ModuleKind::Collection => ModuleKind::Resource,
    };
    if aggregation.find(name, other).is_some() {
        BuildError::Validation(format!("{name} is a {other} module, not a {kind} module"))
    } else {
        BuildError::Validation(format!("unknown {kind} module {name}"))
    }
}

fn note(log: &mut BuildLog, line: impl Into<String>) {
    let line = line.into();
    info!("{}", line);
    log.push(line);
}
