//! Handlers for the `/workflows` resource.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use comfygen_core::naming::WORKFLOW_PREFIX;
use comfygen_core::workflow::{validate_timeout_secs, JobDescription, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::{download_url, ExecuteResponse, QueueStatusResponse, WorkflowResult};
use crate::state::AppState;

/// Request body for `POST /workflows/execute`.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// ComfyUI workflow in API format.
    #[serde(default)]
    pub workflow: Option<serde_json::Value>,
    /// Generation deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// POST /api/v1/workflows/execute
///
/// Runs a caller-supplied workflow unchanged and stores its images as
/// `workflow_{node}_{index}.png`.
pub async fn execute(
    State(state): State<AppState>,
    Json(input): Json<ExecuteRequest>,
) -> AppResult<Json<ExecuteResponse>> {
    let raw = input
        .workflow
        .ok_or_else(|| AppError::BadRequest("Workflow data is required".into()))?;
    validate_timeout_secs(input.timeout)?;
    let workflow = JobDescription::from_value(raw)?;

    let results = state
        .comfyui
        .generate_images(&workflow, Some(Duration::from_secs(input.timeout)))
        .await?;
    let saved = state.storage.save_results(WORKFLOW_PREFIX, &results).await?;

    tracing::info!(images = saved.len(), "Workflow executed");

    let results = saved
        .into_iter()
        .map(|s| WorkflowResult {
            url: download_url(&s.filename),
            node_id: s.node_id,
            filename: s.filename,
        })
        .collect();

    Ok(Json(ExecuteResponse {
        success: true,
        message: "Workflow executed successfully",
        results,
    }))
}

/// GET /api/v1/workflows/queue/status
pub async fn queue_status(State(state): State<AppState>) -> AppResult<Json<QueueStatusResponse>> {
    let queue_status = state.comfyui.queue_status().await?;
    Ok(Json(QueueStatusResponse {
        success: true,
        queue_status,
    }))
}
