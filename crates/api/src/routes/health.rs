use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::state::AppState;

/// Routes mounted at `/health`.
///
/// ```text
/// GET /ping      -> ping
/// GET /comfyui   -> comfyui
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(health::ping))
        .route("/comfyui", get(health::comfyui))
}
