//! Loading of the workflow template behind `POST /images/generate`.

use std::path::Path;

use comfygen_core::workflow::JobDescription;

use crate::error::{AppError, AppResult};

/// Read and validate the workflow template at `path`.
///
/// The file is re-read on every call so edits take effect without a
/// restart. A missing or invalid template is a server misconfiguration.
pub async fn load_workflow(path: &Path) -> AppResult<JobDescription> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        AppError::InternalError(format!(
            "Failed to read workflow template {}: {e}",
            path.display()
        ))
    })?;

    let value: serde_json::Value = serde_json::from_slice(&raw).map_err(|e| {
        AppError::InternalError(format!(
            "Workflow template {} is not valid JSON: {e}",
            path.display()
        ))
    })?;

    JobDescription::from_value(value).map_err(|e| {
        AppError::InternalError(format!(
            "Workflow template {} is invalid: {e}",
            path.display()
        ))
    })
}
