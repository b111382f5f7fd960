//! Command-line and environment configuration.

use clap::{Parser, ValueEnum};
use packsmith_store::S3Config;
use packsmith_types::Environment;
use std::path::PathBuf;

use crate::error::ServerError;

/// Artifact store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    S3,
    /// In-process store; artifacts are lost on exit.
    Memory,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "packsmith")]
#[command(about = "Builds, publishes and syncs resource packs on demand", version)]
pub struct Args {
    /// HTTP port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Directory holding the source tree checkouts
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Prefix of every artifact name
    #[arg(long, env = "BRAND", default_value = "mcwzh-meme")]
    pub brand: String,

    /// Upstream name of the java repository (also its directory under the data dir)
    #[arg(long, env = "JAVA_REPO", default_value = "mcwzh-meme-resourcepack")]
    pub java_repo: String,

    /// Upstream name of the bedrock repository
    #[arg(long, env = "BEDROCK_REPO", default_value = "mcwzh-meme-resourcepack-bedrock")]
    pub bedrock_repo: String,

    #[arg(long, env = "STORE", value_enum, default_value = "s3")]
    pub store: StoreBackend,

    /// S3 endpoint; derived from the region when unset
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    #[arg(long, env = "S3_REGION", default_value = "")]
    pub s3_region: String,

    #[arg(long, env = "S3_KEYID", default_value = "", hide_env_values = true)]
    pub s3_key_id: String,

    #[arg(long, env = "S3_SECRET", default_value = "", hide_env_values = true)]
    pub s3_secret: String,

    #[arg(long, env = "S3_BUCKET", default_value = "")]
    pub s3_bucket: String,

    /// Public download root returned with every artifact name
    #[arg(long, env = "S3_ROOT", default_value = "")]
    pub s3_root: String,

    /// Shared secret for webhook signatures
    #[arg(long, env = "GH_WEBHOOK_SECRET", default_value = "", hide_env_values = true)]
    pub webhook_secret: String,

    /// Token for deployment status callbacks
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub gh_token: Option<String>,

    /// `production` rejects unsigned webhooks, `development` only logs them
    #[arg(long, env = "APP_ENV", default_value = "production")]
    pub app_env: Environment,

    /// Existence checks attempted before uploading blind
    #[arg(long, env = "EXISTENCE_ATTEMPTS", default_value = "3")]
    pub existence_attempts: u32,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub brand: String,
    pub java_repo: String,
    pub bedrock_repo: String,
    pub store: StoreBackend,
    pub s3: S3Config,
    pub webhook_secret: String,
    pub gh_token: Option<String>,
    pub environment: Environment,
    pub existence_attempts: u32,
}

impl ServerConfig {
    /// Source tree of the java repository.
    pub fn java_root(&self) -> PathBuf {
        self.data_dir.join(&self.java_repo)
    }

    pub fn bedrock_root(&self) -> PathBuf {
        self.data_dir.join(&self.bedrock_repo)
    }

    /// A memory-backed configuration rooted at `data_dir`, for local runs
    /// and tests.
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            port: 0,
            data_dir: data_dir.into(),
            brand: "mcwzh-meme".to_string(),
            java_repo: "mcwzh-meme-resourcepack".to_string(),
            bedrock_repo: "mcwzh-meme-resourcepack-bedrock".to_string(),
            store: StoreBackend::Memory,
            s3: S3Config {
                endpoint: None,
                region: String::new(),
                bucket: String::new(),
                access_key_id: String::new(),
                secret_access_key: String::new(),
                public_root: String::new(),
                force_path_style: false,
            },
            webhook_secret: String::new(),
            gh_token: None,
            environment: Environment::Production,
            existence_attempts: 3,
        }
    }
}

impl TryFrom<Args> for ServerConfig {
    type Error = ServerError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.brand.trim().is_empty() {
            return Err(ServerError::Config("BRAND must not be empty".into()));
        }
        if args.java_repo == args.bedrock_repo {
            return Err(ServerError::Config(
                "JAVA_REPO and BEDROCK_REPO must differ".into(),
            ));
        }
        if args.webhook_secret.is_empty() && args.app_env.is_production() {
            return Err(ServerError::Config(
                "GH_WEBHOOK_SECRET is required in production".into(),
            ));
        }

        let endpoint = args.s3_endpoint.or_else(|| {
            (!args.s3_region.is_empty()).then(|| format!("https://{}.aliyuncs.com", args.s3_region))
        });
        let s3 = S3Config {
            endpoint,
            region: args.s3_region,
            bucket: args.s3_bucket,
            access_key_id: args.s3_key_id,
            secret_access_key: args.s3_secret,
            public_root: args.s3_root,
            force_path_style: false,
        };
        if args.store == StoreBackend::S3 {
            s3.validate()
                .map_err(|e| ServerError::Config(e.to_string()))?;
        }

        Ok(Self {
            port: args.port,
            data_dir: args.data_dir,
            brand: args.brand,
            java_repo: args.java_repo,
            bedrock_repo: args.bedrock_repo,
            store: args.store,
            s3,
            webhook_secret: args.webhook_secret,
            gh_token: args.gh_token.filter(|t| !t.is_empty()),
            environment: args.app_env,
            existence_attempts: args.existence_attempts.max(1),
        })
    }
}
