//! Tests for `AppError` -> HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server
//! is involved.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use comfygen_api::error::AppError;
use comfygen_comfyui::api::ComfyUIApiError;
use comfygen_comfyui::session::TransportError;
use comfygen_comfyui::JobError;
use comfygen_core::error::CoreError;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

fn upstream_400() -> TransportError {
    TransportError::Api(ComfyUIApiError::ApiError {
        status: 400,
        body: "prompt_no_outputs".into(),
    })
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Image",
        id: "x.png".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Image not found: x.png");
}

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("Workflow must not be empty".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Workflow must not be empty");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("positive_prompt is required".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "positive_prompt is required");
}

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("template at /etc/secret unreadable".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn storage_error_returns_500() {
    let err = AppError::Storage(std::io::Error::other("disk full"));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn generation_timeout_returns_504() {
    let err = AppError::Job(JobError::TimedOut {
        elapsed: Duration::from_secs(300),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["code"], "GENERATION_TIMEOUT");
    assert!(json["error"].as_str().unwrap().starts_with("Generation timeout"));
}

#[tokio::test]
async fn upstream_job_failures_return_502() {
    let failures = [
        JobError::Submit(upstream_400()),
        JobError::HistoryMissing {
            prompt_id: "abc".into(),
        },
        JobError::ArtifactFetch {
            filename: "f.png".into(),
            source: upstream_400(),
        },
    ];

    for failure in failures {
        let (status, json) = error_to_response(AppError::Job(failure)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["code"], "COMFYUI_ERROR");
    }
}

#[tokio::test]
async fn cancelled_generation_returns_503() {
    let (status, json) = error_to_response(AppError::Job(JobError::Cancelled)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "GENERATION_CANCELLED");
}

#[tokio::test]
async fn transport_error_returns_502() {
    let (status, json) = error_to_response(AppError::Transport(upstream_400())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "COMFYUI_ERROR");
    assert_eq!(json["error"], "ComfyUI API error (400): prompt_no_outputs");
}
