//! Response payload types shared by the image and workflow handlers.
//!
//! Successful responses are flat objects carrying `"success": true`
//! alongside the payload, matching what existing clients of the service
//! expect.

use serde::Serialize;

/// Public download URL of a stored image.
pub fn download_url(filename: &str) -> String {
    format!("/api/v1/images/download/{filename}")
}

/// One image produced by `POST /images/generate`.
#[derive(Debug, Serialize)]
pub struct GeneratedImage {
    pub node_id: String,
    pub filename: String,
    pub filepath: String,
    pub url: String,
}

/// Echo of the parameters a generation actually ran with.
#[derive(Debug, Serialize)]
pub struct GenerationParameters {
    pub positive_prompt: String,
    pub negative_prompt: String,
    /// The seed after resolving `-1` to a random value.
    pub seed: i64,
    pub steps: u32,
    pub cfg_scale: f64,
    pub width: u32,
    pub height: u32,
}

/// Body of a successful `POST /images/generate`.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: &'static str,
    pub images: Vec<GeneratedImage>,
    pub parameters: GenerationParameters,
}

/// One image produced by `POST /workflows/execute`.
#[derive(Debug, Serialize)]
pub struct WorkflowResult {
    pub node_id: String,
    pub filename: String,
    pub url: String,
}

/// Body of a successful `POST /workflows/execute`.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub message: &'static str,
    pub results: Vec<WorkflowResult>,
}

/// Body of `GET /images/list`.
#[derive(Debug, Serialize)]
pub struct ImageListResponse<T: Serialize> {
    pub success: bool,
    pub images: Vec<T>,
}

/// Body of `GET /workflows/queue/status`.
#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub success: bool,
    pub queue_status: serde_json::Value,
}
