use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::WorkerConfig;
use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the worker API router
///
/// Job bodies carry base64 audio, so `/runsync` takes up to
/// `config.max_job_bytes` instead of axum's default limit.
pub fn create_api_router(config: &WorkerConfig) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_check))
        .route(
            "/runsync",
            post(api::run_sync).layer(DefaultBodyLimit::max(config.max_job_bytes)),
        )
        .layer(TraceLayer::new_for_http())
}
