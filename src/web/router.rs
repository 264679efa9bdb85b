//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers::{delete_file, download_file, get_file, list_files, upload_file, AppState};
use super::middleware::create_cors_layer;
use super::openapi::ApiDoc;

/// Allowance for multipart boundaries and part headers on top of the
/// maximum file size.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let body_limit = app_state
        .service
        .max_upload_size()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/files/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/files/", get(list_files))
        .route("/files/:short_id", get(get_file))
        .route("/files/download/:short_id", get(download_file))
        .route("/files/delete/:short_id", delete(delete_file))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create the OpenAPI document router.
pub fn create_openapi_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
