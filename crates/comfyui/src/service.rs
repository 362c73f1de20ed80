//! The collaborator-facing entry points used by the HTTP handlers.

use std::time::Duration;

use comfygen_core::workflow::JobDescription;

use crate::client::ComfyUIClient;
use crate::config::ComfyUIConfig;
use crate::job::{JobClient, JobError, ResultSet};
use crate::session::TransportError;

/// Generates images on one configured ComfyUI server.
///
/// Created once at startup and shared behind an `Arc`; every call to
/// [`generate_images`](Self::generate_images) opens its own connection.
pub struct ComfyUIService {
    jobs: JobClient<ComfyUIClient>,
    default_timeout: Duration,
}

impl ComfyUIService {
    pub fn new(config: &ComfyUIConfig) -> Self {
        Self {
            jobs: JobClient::new(ComfyUIClient::new(config), config.poll_interval),
            default_timeout: config.default_timeout,
        }
    }

    /// Run `workflow` and download every produced image.
    ///
    /// `timeout` bounds the wait for completion after submission and
    /// defaults to the configured `default_timeout`.
    pub async fn generate_images(
        &self,
        workflow: &JobDescription,
        timeout: Option<Duration>,
    ) -> Result<ResultSet, JobError> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        tracing::info!(
            server = %self.jobs.connector().ws_url(),
            nodes = workflow.len(),
            timeout_secs = timeout.as_secs(),
            "Starting generation",
        );
        self.jobs.run(workflow, timeout).await
    }

    /// Current ComfyUI queue state, passed through unmodified.
    pub async fn queue_status(&self) -> Result<serde_json::Value, TransportError> {
        Ok(self.jobs.connector().api().get_queue().await?)
    }
}
