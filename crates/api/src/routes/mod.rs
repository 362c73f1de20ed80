pub mod health;
pub mod images;
pub mod workflows;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` routes that answer without waiting on a generation.
///
/// Route hierarchy:
///
/// ```text
/// /health/ping                   liveness (GET)
/// /health/comfyui                upstream reachability (GET)
///
/// /images/download/{filename}    download a stored image (GET)
/// /images/list                   list stored images (GET)
///
/// /workflows/queue/status        ComfyUI queue state (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/health", health::router())
        .nest("/images", images::router())
        .nest("/workflows", workflows::router())
}

/// Build the `/api/v1` routes that block until a ComfyUI run finishes.
///
/// These are bounded by the per-run generation deadline rather than the
/// server-wide request timeout.
///
/// ```text
/// /images/generate               generate from the default template (POST)
/// /workflows/execute             run a caller-supplied workflow (POST)
/// ```
pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/images/generate", post(handlers::images::generate))
        .route("/workflows/execute", post(handlers::workflows::execute))
}
