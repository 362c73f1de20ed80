//! Handlers for the `/health` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Liveness response payload.
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /api/v1/health/ping
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "healthy",
        message: "Server is running",
    })
}

/// GET /api/v1/health/comfyui
///
/// 200 with the queue state when ComfyUI answers `/queue`, 503 otherwise.
pub async fn comfyui(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.comfyui.queue_status().await {
        Ok(queue_info) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "comfyui_connected": true,
                "queue_info": queue_info,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "ComfyUI health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "comfyui_connected": false,
                    "error": e.to_string(),
                })),
            )
        }
    }
}
