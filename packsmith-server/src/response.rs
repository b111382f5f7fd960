//! Response bodies, shaped per API version.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use packsmith_build::BuildOutcome;
use packsmith_modules::Aggregation;
use packsmith_types::{ModuleDescriptor, ModuleKind};
use serde::Serialize;
use tracing::error;

/// API generation a response is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// `GET /` and `POST /ajax`.
    V1,
    V2,
}

impl ApiVersion {
    pub const DEPRECATION: &'static str =
        "This endpoint is deprecated; use GET /v2/modules and POST /v2/build/{java,bedrock}.";

    /// Serializes `body`, adding the deprecation notice on v1.
    pub fn respond<T: Serialize>(self, status: StatusCode, body: &T) -> Response {
        let mut value = match serde_json::to_value(body) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        if let (ApiVersion::V1, Some(object)) = (self, value.as_object_mut()) {
            object.insert("deprecation".into(), Self::DEPRECATION.into());
        }
        (status, Json(value)).into_response()
    }
}

/// Modules of one platform, split by kind.
#[derive(Debug, Serialize)]
pub struct ModuleGroups {
    pub resource: Vec<ModuleDescriptor>,
    pub collection: Vec<ModuleDescriptor>,
}

impl From<&Aggregation> for ModuleGroups {
    fn from(aggregation: &Aggregation) -> Self {
        Self {
            resource: aggregation.by_kind(ModuleKind::Resource).cloned().collect(),
            collection: aggregation.by_kind(ModuleKind::Collection).cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModulesBody {
    pub mods: Vec<String>,
    pub enmods: Vec<String>,
    pub je_modules: ModuleGroups,
    pub be_modules: ModuleGroups,
    /// Milliseconds since the epoch; 0 when unknown.
    pub je_modified: i64,
    pub be_modified: i64,
}

#[derive(Debug, Serialize)]
pub struct BuildBody {
    pub logs: String,
    pub filename: String,
    pub root: String,
    pub checksum: String,
    pub size: u64,
}

impl BuildBody {
    pub fn new(outcome: BuildOutcome, root: &str) -> Self {
        Self {
            logs: outcome.log,
            filename: outcome.artifact.name,
            root: root.to_string(),
            checksum: outcome.artifact.checksum,
            size: outcome.artifact.size,
        }
    }
}
