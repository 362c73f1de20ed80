use axum::routing::get;
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/images`.
///
/// ```text
/// GET  /download/{filename}    -> download
/// GET  /list                   -> list
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/download/{filename}", get(images::download))
        .route("/list", get(images::list))
}
