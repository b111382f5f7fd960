//! HTTP routes.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use packsmith_build::BuildError;
use packsmith_sync::{SyncOutcome, SIGNATURE_HEADER};
use packsmith_types::{BuildRequest, BuildType, ModuleSelection};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use crate::response::{ApiVersion, BuildBody, ModuleGroups, ModulesBody};

type AppState = Arc<AppContext>;

/// Builds the HTTP router.
pub fn build_router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/v2/modules", get(modules_v2))
        .route("/v2/build/java", post(build_java))
        .route("/v2/build/bedrock", post(build_bedrock))
        .route("/github/", post(github_webhook))
        .route("/github", post(github_webhook))
        // Deprecated v1 surface
        .route("/", get(modules_v1))
        .route("/ajax", post(build_v1))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
        .with_state(context)
}

// ── Modules ──────────────────────────────────────────────────────

async fn modules_v2(State(ctx): State<AppState>) -> Response {
    modules(&ctx, ApiVersion::V2).await
}

async fn modules_v1(State(ctx): State<AppState>) -> Response {
    modules(&ctx, ApiVersion::V1).await
}

async fn modules(ctx: &AppContext, version: ApiVersion) -> Response {
    match collect_modules(ctx).await {
        Ok(body) => version.respond(StatusCode::OK, &body),
        Err(e) => e.into_versioned_response(version),
    }
}

async fn collect_modules(ctx: &AppContext) -> ApiResult<ModulesBody> {
    let java = ctx.java.orchestrator.modules().await.map_err(ApiError::Modules)?;
    let bedrock = ctx
        .bedrock
        .orchestrator
        .modules()
        .await
        .map_err(ApiError::Modules)?;
    Ok(ModulesBody {
        je_modules: ModuleGroups::from(&java),
        be_modules: ModuleGroups::from(&bedrock),
        mods: java.overlays.mods,
        enmods: java.overlays.en_mods,
        je_modified: ctx.java.repository.last_synced_millis().await,
        be_modified: ctx.bedrock.repository.last_synced_millis().await,
    })
}

// ── Builds ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JavaBuildBody {
    #[serde(rename = "type", default)]
    build_type: BuildType,
    #[serde(default)]
    modules: ModuleSelection,
    #[serde(default)]
    format: Option<u32>,
    #[serde(default)]
    mods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BedrockBuildBody {
    #[serde(rename = "type", default)]
    build_type: BuildType,
    #[serde(default)]
    modules: ModuleSelection,
    #[serde(default)]
    extension: Option<String>,
}

/// `POST /ajax` body. Bedrock requests carry the extension in `type`.
#[derive(Debug, Deserialize)]
struct LegacyBuildBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    modules: ModuleSelection,
    #[serde(default)]
    format: Option<u32>,
    #[serde(default)]
    compatible: bool,
    #[serde(rename = "_be", default)]
    bedrock: bool,
    #[serde(rename = "mod", default)]
    overlays: Vec<String>,
}

impl LegacyBuildBody {
    fn into_request(self) -> ApiResult<BuildRequest> {
        let flag = |build_type| match (build_type, self.compatible) {
            (BuildType::Normal, true) => BuildType::Compatible,
            (build_type, _) => build_type,
        };
        if self.bedrock {
            let mut request = BuildRequest::bedrock(flag(BuildType::Normal), self.modules)
                .with_overlays(self.overlays);
            request.extension = self.kind;
            request.format = self.format;
            Ok(request)
        } else {
            let build_type = match self.kind.as_deref() {
                None | Some("") => BuildType::Normal,
                Some(kind) => kind
                    .parse()
                    .map_err(|e: packsmith_types::Error| ApiError::BadRequest(e.to_string()))?,
            };
            let mut request =
                BuildRequest::java(flag(build_type), self.modules).with_overlays(self.overlays);
            request.format = self.format;
            Ok(request)
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

async fn build_java(State(ctx): State<AppState>, body: Bytes) -> Response {
    let request = parse_body::<JavaBuildBody>(&body).map(|body| {
        let mut request = BuildRequest::java(body.build_type, body.modules).with_overlays(body.mods);
        request.format = body.format;
        request
    });
    build(&ctx, request, ApiVersion::V2).await
}

async fn build_bedrock(State(ctx): State<AppState>, body: Bytes) -> Response {
    let request = parse_body::<BedrockBuildBody>(&body).map(|body| {
        let mut request = BuildRequest::bedrock(body.build_type, body.modules);
        request.extension = body.extension;
        request
    });
    build(&ctx, request, ApiVersion::V2).await
}

async fn build_v1(State(ctx): State<AppState>, body: Bytes) -> Response {
    let request = parse_body::<LegacyBuildBody>(&body).and_then(LegacyBuildBody::into_request);
    build(&ctx, request, ApiVersion::V1).await
}

async fn build(ctx: &AppContext, request: ApiResult<BuildRequest>, version: ApiVersion) -> Response {
    let request = match request {
        Ok(request) => request,
        Err(e) => return e.into_versioned_response(version),
    };
    let orchestrator = &ctx.platform(request.platform).orchestrator;
    let root = orchestrator.public_root().to_string();
    match orchestrator.build(&request).await {
        Ok(outcome) => version.respond(StatusCode::OK, &BuildBody::new(outcome, &root)),
        Err(failure) => {
            if let BuildError::Store(e) = &failure.error {
                error!("Upload failed: {}", e);
            }
            ApiError::Build { failure, root }.into_versioned_response(version)
        }
    }
}

// ── Webhook ──────────────────────────────────────────────────────

async fn github_webhook(
    State(ctx): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<SyncOutcome>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = ctx.coordinator.handle(&body, signature).await?;
    Ok(Json(outcome))
}

// ── Panics ───────────────────────────────────────────────────────

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal error", "code": "PANIC" })),
    )
        .into_response()
}
