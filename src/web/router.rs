//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_folder, download_file, download_file_in_folder, list_folder, list_root, search,
    upload_file, AppState,
};
use super::middleware::{create_catch_panic_layer, create_cors_layer};

/// Welcome text served at `/`.
pub const WELCOME_MESSAGE: &str = "Welcome to filebox!";

/// Create the main router with all middleware applied.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let max_upload_size = app_state.max_upload_size;

    let routes = Router::new()
        .route("/", get(welcome))
        .route("/upload", post(upload_file))
        .route("/upload/:folder_name", post(upload_file))
        .route("/files", get(list_root))
        .route("/files/:folder_name", get(list_folder))
        .route("/createFolder/:folder_name", post(create_folder))
        .route("/search", get(search))
        // Both download routes share the first parameter name, matchit requires it.
        .route("/download/:name", get(download_file))
        .route("/download/:name/:file_name", get(download_file_in_folder))
        .layer(DefaultBodyLimit::max(max_upload_size))
        .with_state(app_state);

    apply_middleware(routes.merge(create_health_router()), cors_origins)
}

/// Wrap a router in request tracing, panic recovery and CORS.
pub fn apply_middleware(router: Router, cors_origins: &[String]) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(cors_origins))
            .layer(create_catch_panic_layer()),
    )
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Welcome handler.
async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}
