//! Error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use packsmith_build::{BuildError, BuildFailure};
use packsmith_store::StoreError;
use packsmith_sync::SyncError;
use serde::Serialize;
use thiserror::Error;

use crate::response::ApiVersion;

/// Startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body could not be parsed.
    #[error("malformed request: {0}")]
    BadRequest(String),

    /// Module metadata could not be read.
    #[error("{0}")]
    Modules(BuildError),

    /// A build failed. `root` is the download root, reported with the
    /// artifact identity when the upload failed.
    #[error("{failure}")]
    Build { failure: BuildFailure, root: String },

    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<bool>,
}

impl ErrorBody {
    fn new(error: String, code: &'static str) -> Self {
        Self {
            error,
            code,
            logs: None,
            message: None,
            stdout: None,
            filename: None,
            checksum: None,
            size: None,
            root: None,
            published: None,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Modules(_) => StatusCode::FORBIDDEN,
            ApiError::Build { failure, .. } => match failure.error {
                BuildError::Store(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::FORBIDDEN,
            },
            ApiError::Sync(e) => match e {
                SyncError::Unauthorized(_) | SyncError::UnknownRepository(_) => {
                    StatusCode::FORBIDDEN
                }
                SyncError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Modules(_) => "MODULES_ERROR",
            ApiError::Build { failure, .. } => match failure.error {
                BuildError::Validation(_) => "VALIDATION_ERROR",
                BuildError::Modules(_) => "MODULES_ERROR",
                BuildError::Assembly(_) => "ASSEMBLY_ERROR",
                BuildError::Store(_) => "STORE_ERROR",
            },
            ApiError::Sync(e) => match e {
                SyncError::Unauthorized(_) => "AUTHENTICATION_ERROR",
                SyncError::UnknownRepository(_) => "VALIDATION_ERROR",
                SyncError::InvalidEvent(_) => "BAD_REQUEST",
                _ => "SYNC_ERROR",
            },
        }
    }

    /// Renders the error for one API version.
    pub fn into_versioned_response(self, version: ApiVersion) -> Response {
        let status = self.status();
        let mut body = ErrorBody::new(self.to_string(), self.code());
        match self {
            ApiError::Modules(_) => body.message = Some(body.error.clone()),
            ApiError::Build { failure, root } => {
                body.logs = Some(failure.log);
                if let (BuildError::Store(_), Some(artifact)) = (&failure.error, failure.artifact) {
                    body.filename = Some(artifact.name);
                    body.checksum = Some(artifact.checksum);
                    body.size = Some(artifact.size);
                    body.root = Some(root);
                    body.published = Some(false);
                }
            }
            ApiError::Sync(e) => body.stdout = e.transcript().map(str::to_string),
            ApiError::BadRequest(_) => {}
        }
        version.respond(status, &body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_versioned_response(ApiVersion::V2)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
