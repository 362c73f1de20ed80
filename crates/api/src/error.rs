use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use comfygen_comfyui::session::TransportError;
use comfygen_comfyui::JobError;
use comfygen_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, the ComfyUI client errors for
/// upstream failures, and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `comfygen_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A generation run failed.
    #[error(transparent)]
    Job(#[from] JobError),

    /// A call to ComfyUI outside of a generation run failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading or writing the output folder failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} not found: {id}"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            // --- Upstream errors ---
            AppError::Job(err) => classify_job_error(err),
            AppError::Transport(err) => {
                tracing::warn!(error = %err, "ComfyUI request failed");
                (StatusCode::BAD_GATEWAY, "COMFYUI_ERROR", err.to_string())
            }

            // --- Local I/O ---
            AppError::Storage(err) => {
                tracing::error!(error = %err, "Storage error");
                internal()
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a failed generation run into an HTTP status, error code, and message.
///
/// - `TimedOut` maps to 504.
/// - `Cancelled` maps to 503.
/// - Every other failure is an upstream problem and maps to 502.
fn classify_job_error(err: &JobError) -> (StatusCode, &'static str, String) {
    match err {
        JobError::TimedOut { .. } => {
            tracing::warn!(error = %err, "Generation timed out");
            (StatusCode::GATEWAY_TIMEOUT, "GENERATION_TIMEOUT", err.to_string())
        }
        JobError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "GENERATION_CANCELLED",
            err.to_string(),
        ),
        JobError::Connect(_)
        | JobError::Submit(_)
        | JobError::Transport { .. }
        | JobError::History { .. }
        | JobError::HistoryMissing { .. }
        | JobError::ArtifactFetch { .. } => {
            tracing::error!(error = %err, "Generation failed");
            (StatusCode::BAD_GATEWAY, "COMFYUI_ERROR", err.to_string())
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
