//! Handlers for the `/images` resource.
//!
//! `generate` fills the default workflow template with the caller's prompt
//! and stores every produced image in the output folder; `download` and
//! `list` serve that folder.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use comfygen_core::naming::GENERATED_PREFIX;
use comfygen_core::workflow::{apply_params, resolve_seed, WorkflowParams, RANDOM_SEED};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::{
    download_url, GenerateResponse, GeneratedImage, GenerationParameters, ImageListResponse,
};
use crate::state::AppState;
use crate::storage::StoredImage;
use crate::templates::load_workflow;

/// Request body for `POST /images/generate`.
///
/// `steps`, `cfg_scale`, `width` and `height` are accepted and echoed back
/// but the default template has no mapping for them.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub positive_prompt: Option<String>,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f64,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
}

fn default_seed() -> i64 {
    RANDOM_SEED
}

fn default_steps() -> u32 {
    20
}

fn default_cfg_scale() -> f64 {
    7.0
}

fn default_dimension() -> u32 {
    512
}

/// POST /api/v1/images/generate
pub async fn generate(
    State(state): State<AppState>,
    Json(input): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let positive_prompt = match input.positive_prompt {
        Some(p) if !p.trim().is_empty() => p,
        _ => return Err(AppError::BadRequest("positive_prompt is required".into())),
    };
    let seed = resolve_seed(input.seed);

    let mut workflow = load_workflow(&state.config.default_workflow_path).await?;
    apply_params(
        &mut workflow,
        &WorkflowParams {
            positive_prompt: Some(positive_prompt.clone()),
            negative_prompt: Some(input.negative_prompt.clone()),
            seed: Some(seed),
        },
    );

    let results = state.comfyui.generate_images(&workflow, None).await?;
    let saved = state
        .storage
        .save_results(GENERATED_PREFIX, &results)
        .await?;

    tracing::info!(images = saved.len(), seed, "Generation complete");

    let images = saved
        .into_iter()
        .map(|s| GeneratedImage {
            url: download_url(&s.filename),
            filepath: s.path.display().to_string(),
            node_id: s.node_id,
            filename: s.filename,
        })
        .collect();

    Ok(Json(GenerateResponse {
        success: true,
        message: "Images generated successfully",
        images,
        parameters: GenerationParameters {
            positive_prompt,
            negative_prompt: input.negative_prompt,
            seed,
            steps: input.steps,
            cfg_scale: input.cfg_scale,
            width: input.width,
            height: input.height,
        },
    }))
}

/// GET /api/v1/images/download/{filename}
///
/// Returns the raw PNG as an attachment.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let data = state.storage.read(&filename).await?;
    let disposition = format!("attachment; filename=\"{filename}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}

/// GET /api/v1/images/list
pub async fn list(State(state): State<AppState>) -> AppResult<Json<ImageListResponse<StoredImage>>> {
    let images = state.storage.list().await?;
    Ok(Json(ImageListResponse {
        success: true,
        images,
    }))
}
