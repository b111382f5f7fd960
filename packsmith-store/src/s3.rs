//! S3-compatible object store.
//!
//! Uses `HeadObject` for existence checks and `PutObject` for uploads. Works
//! against AWS and S3-compatible endpoints (OSS, MinIO) through
//! `endpoint_url`.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::ArtifactStore;

/// Connection settings for an S3-compatible bucket.
#[derive(Clone)]
pub struct S3Config {
    /// Custom endpoint (e.g. `https://oss-cn-hangzhou.aliyuncs.com`). AWS when `None`.
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Public download root returned to clients alongside artifact names.
    pub public_root: String,
    /// Path-style addressing instead of virtual-host style.
    pub force_path_style: bool,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("public_root", &self.public_root)
            .field("force_path_style", &self.force_path_style)
            .finish_non_exhaustive()
    }
}

impl S3Config {
    /// Checks that every required field is present.
    pub fn validate(&self) -> StoreResult<()> {
        for (field, value) in [
            ("region", &self.region),
            ("bucket", &self.bucket),
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::Config(format!("S3 {field} is not set")));
            }
        }
        Ok(())
    }
}

/// Artifact store backed by one S3 bucket.
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    public_root: String,
}

impl S3ArtifactStore {
    /// Builds a client from static credentials.
    pub async fn connect(config: S3Config) -> StoreResult<Self> {
        config.validate()?;

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "packsmith",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        info!(
            "S3 artifact store ready (bucket {}, region {})",
            config.bucket, config.region
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket,
            public_root: config.public_root,
        })
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    fn provider_name(&self) -> &'static str {
        "S3"
    }

    fn public_root(&self) -> &str {
        &self.public_root
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err.as_service_error().is_some_and(|e| e.is_not_found())
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if not_found {
                    debug!("{} not in bucket {}", name, self.bucket);
                    Ok(false)
                } else {
                    let denied = err
                        .raw_response()
                        .is_some_and(|r| matches!(r.status().as_u16(), 401 | 403));
                    let message = format!("HeadObject {name}: {}", DisplayErrorContext(&err));
                    Err(if denied {
                        StoreError::Denied(message)
                    } else {
                        StoreError::S3(message)
                    })
                }
            }
        }
    }

    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let len = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| {
                let denied = err
                    .raw_response()
                    .is_some_and(|r| matches!(r.status().as_u16(), 401 | 403));
                let message = format!("PutObject {name}: {}", DisplayErrorContext(&err));
                if denied {
                    StoreError::Denied(message)
                } else {
                    StoreError::S3(message)
                }
            })?;
        info!("Uploaded {} ({} bytes) to {}", name, len, self.bucket);
        Ok(())
    }
}
