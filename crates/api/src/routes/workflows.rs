use axum::routing::get;
use axum::Router;

use crate::handlers::workflows;
use crate::state::AppState;

/// Routes mounted at `/workflows`.
///
/// ```text
/// GET  /queue/status   -> queue_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue/status", get(workflows::queue_status))
}
