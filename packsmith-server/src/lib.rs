//! HTTP service for packsmith.
//!
//! Routes:
//! - `GET /v2/modules`: module metadata for both platforms
//! - `POST /v2/build/java`, `POST /v2/build/bedrock`: build and publish
//! - `POST /github/`: signed webhook that resyncs a source tree
//! - `GET /`, `POST /ajax`: deprecated v1 equivalents
//!
//! The [`AppContext`] is built once in `main` and handed to the router as
//! state.

mod api;
mod config;
mod context;
mod error;
mod response;

pub use api::build_router;
pub use config::{Args, ServerConfig, StoreBackend};
pub use context::{AppContext, PlatformContext};
pub use error::{ApiError, ApiResult, ServerError};
pub use response::ApiVersion;
