//! Run one workflow end-to-end on a ComfyUI server.
//!
//! [`JobClient::run`] drives a single prompt through
//!
//! ```text
//! Idle -> Connecting -> Submitted -> Awaiting -> Completed
//! ```
//!
//! opening a fresh [`TransportSession`] for it, waiting for the
//! `executing` frame with `node == null` for our `prompt_id`, reading the
//! prompt's history and downloading every listed image. Failures end the
//! run as a [`JobError`]; the session is closed exactly once on every path.

use std::time::Duration;

use comfygen_core::workflow::JobDescription;
use indexmap::IndexMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::fetcher::{Artifact, ArtifactFetcher};
use crate::history::{HistoryEntry, HistoryResponse};
use crate::messages::{parse_message, ComfyUIMessage, MessageError};
use crate::session::{Connector, Frame, TransportError, TransportSession};

/// Downloaded artifacts keyed by output node, in history order.
pub type ResultSet = IndexMap<String, Vec<Artifact>>;

/// Non-terminal phases of a run. Terminal outcomes are the `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Idle,
    Connecting,
    Submitted,
    Awaiting,
    Completed,
}

impl JobPhase {
    /// Whether `next` directly follows `self`.
    pub fn can_advance_to(self, next: JobPhase) -> bool {
        matches!(
            (self, next),
            (JobPhase::Idle, JobPhase::Connecting)
                | (JobPhase::Connecting, JobPhase::Submitted)
                | (JobPhase::Submitted, JobPhase::Awaiting)
                | (JobPhase::Awaiting, JobPhase::Completed)
        )
    }
}

/// Terminal failures of a run.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// WebSocket handshake failed. Not retried.
    #[error("Failed to connect to ComfyUI: {0}")]
    Connect(#[source] TransportError),

    /// `POST /prompt` was rejected or unreachable.
    #[error("Failed to queue prompt: {0}")]
    Submit(#[source] TransportError),

    /// The deadline passed before the completion frame arrived.
    #[error("Generation timeout after {elapsed:?}")]
    TimedOut { elapsed: Duration },

    /// The WebSocket broke while waiting for completion.
    #[error("Connection lost while waiting for prompt {prompt_id}: {source}")]
    Transport {
        prompt_id: String,
        source: TransportError,
    },

    /// `GET /history/{prompt_id}` failed or returned an undecodable body.
    #[error("Failed to get history for prompt {prompt_id}: {source}")]
    History {
        prompt_id: String,
        source: TransportError,
    },

    /// The server finished the prompt but has no history for it.
    #[error("No history recorded for completed prompt {prompt_id}")]
    HistoryMissing { prompt_id: String },

    /// One image failed to download; the whole run fails.
    #[error("Failed to get image {filename}: {source}")]
    ArtifactFetch {
        filename: String,
        source: TransportError,
    },

    /// The caller's cancellation token fired.
    #[error("Generation cancelled")]
    Cancelled,
}

/// Submits workflows and collects their outputs.
///
/// Holds no per-run state: concurrent [`run`](Self::run) calls each get
/// their own `client_id` and session.
pub struct JobClient<C> {
    connector: C,
    poll_interval: Duration,
}

/// Bookkeeping for one run, used for phase tracking and logging.
struct JobRun {
    client_id: String,
    phase: JobPhase,
}

impl JobRun {
    fn advance(&mut self, next: JobPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "invalid job transition {:?} -> {next:?}",
            self.phase,
        );
        tracing::debug!(
            client_id = %self.client_id,
            from = ?self.phase,
            to = ?next,
            "Job phase transition",
        );
        self.phase = next;
    }
}

impl<C: Connector> JobClient<C> {
    /// * `poll_interval` - upper bound on a single WebSocket receive;
    ///   the deadline is re-checked at least this often.
    pub fn new(connector: C, poll_interval: Duration) -> Self {
        Self {
            connector,
            poll_interval,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run `workflow` to completion or until `timeout` elapses after
    /// submission.
    pub async fn run(
        &self,
        workflow: &JobDescription,
        timeout: Duration,
    ) -> Result<ResultSet, JobError> {
        self.run_with_cancel(workflow, timeout, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), additionally aborting with
    /// [`JobError::Cancelled`] when `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        workflow: &JobDescription,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, JobError> {
        let mut run = JobRun {
            client_id: uuid::Uuid::new_v4().to_string(),
            phase: JobPhase::Idle,
        };

        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        run.advance(JobPhase::Connecting);
        let mut session = match self.connector.open(&run.client_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(client_id = %run.client_id, error = %e, "Failed to connect to ComfyUI");
                return Err(JobError::Connect(e));
            }
        };

        // Every failure past this point returns from `drive`, so the
        // session is closed on all paths.
        let outcome = self
            .drive(&mut session, &mut run, workflow, timeout, cancel)
            .await;
        session.close().await;

        match &outcome {
            Ok(results) => tracing::info!(
                client_id = %run.client_id,
                nodes = results.len(),
                images = results.values().map(Vec::len).sum::<usize>(),
                "Generation completed",
            ),
            Err(e) => tracing::error!(
                client_id = %run.client_id,
                phase = ?run.phase,
                error = %e,
                "Generation failed",
            ),
        }

        outcome
    }

    async fn drive(
        &self,
        session: &mut C::Session,
        run: &mut JobRun,
        workflow: &JobDescription,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, JobError> {
        let receipt = session.submit(workflow).await.map_err(JobError::Submit)?;
        let prompt_id = receipt.prompt_id;
        run.advance(JobPhase::Submitted);
        tracing::info!(
            client_id = %run.client_id,
            prompt_id = %prompt_id,
            queue_number = receipt.number,
            "Prompt queued",
        );

        let submitted_at = Instant::now();
        run.advance(JobPhase::Awaiting);
        self.await_completion(session, &prompt_id, submitted_at, timeout, cancel)
            .await?;
        run.advance(JobPhase::Completed);

        let entry = fetch_history(&*session, &prompt_id).await?;
        collect_artifacts(&*session, entry).await
    }

    /// Consume frames until our completion marker arrives.
    ///
    /// Idle waits, binary/control frames, unrelated or malformed messages
    /// are skipped. The deadline is checked before every receive.
    async fn await_completion(
        &self,
        session: &mut C::Session,
        prompt_id: &str,
        submitted_at: Instant,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), JobError> {
        loop {
            let elapsed = submitted_at.elapsed();
            if elapsed >= timeout {
                tracing::warn!(prompt_id = %prompt_id, ?elapsed, "Generation deadline exceeded");
                return Err(JobError::TimedOut { elapsed });
            }
            let wait = self.poll_interval.min(timeout - elapsed);

            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                frame = session.next_frame(wait) => frame,
            };

            let frame = frame.map_err(|source| JobError::Transport {
                prompt_id: prompt_id.to_string(),
                source,
            })?;

            if let Frame::Text(text) = frame {
                if is_completion(&text, prompt_id) {
                    tracing::info!(prompt_id = %prompt_id, "Execution completed (all nodes done)");
                    return Ok(());
                }
            }
        }
    }
}

/// Inspect one text frame; `true` only for our completion marker.
fn is_completion(text: &str, prompt_id: &str) -> bool {
    match parse_message(text) {
        Ok(ComfyUIMessage::Executing(data)) => {
            if data.is_completion_of(prompt_id) {
                return true;
            }
            if let Some(node) = data.node {
                tracing::debug!(prompt_id = %data.prompt_id, node = %node, "Executing node");
            }
            false
        }
        Ok(ComfyUIMessage::Progress(data)) => {
            tracing::debug!(value = data.value, max = data.max, "Generation progress");
            false
        }
        Ok(ComfyUIMessage::ExecutionError(data)) => {
            if data.prompt_id == prompt_id {
                tracing::error!(
                    prompt_id = %data.prompt_id,
                    node_id = ?data.node_id,
                    error_type = %data.exception_type,
                    error_message = %data.exception_message,
                    "Execution error",
                );
            }
            false
        }
        Ok(other) => {
            tracing::trace!(message = ?other, "Ignoring ComfyUI message");
            false
        }
        Err(MessageError::Unhandled(kind)) => {
            tracing::trace!(kind = %kind, "Ignoring unhandled ComfyUI message");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, raw_message = %text, "Failed to parse ComfyUI message");
            false
        }
    }
}

/// `GET /history/{prompt_id}` and extract our entry.
async fn fetch_history<S: TransportSession>(
    session: &S,
    prompt_id: &str,
) -> Result<HistoryEntry, JobError> {
    let history_error = |source: TransportError| JobError::History {
        prompt_id: prompt_id.to_string(),
        source,
    };

    let body = session
        .fetch(&format!("/history/{prompt_id}"), &[])
        .await
        .map_err(history_error)?;
    let mut history: HistoryResponse =
        serde_json::from_slice(&body).map_err(|e| history_error(e.into()))?;

    history
        .shift_remove(prompt_id)
        .ok_or_else(|| JobError::HistoryMissing {
            prompt_id: prompt_id.to_string(),
        })
}

/// Download every image of every output node, preserving order.
async fn collect_artifacts<S: TransportSession>(
    session: &S,
    entry: HistoryEntry,
) -> Result<ResultSet, JobError> {
    let fetcher = ArtifactFetcher::new(session);
    let mut results = ResultSet::with_capacity(entry.outputs.len());

    for (node_id, output) in entry.outputs {
        let mut artifacts = Vec::with_capacity(output.images.len());
        for reference in output.images {
            let data = fetcher
                .fetch(&reference)
                .await
                .map_err(|source| JobError::ArtifactFetch {
                    filename: reference.filename.clone(),
                    source,
                })?;
            artifacts.push(Artifact { reference, data });
        }
        results.insert(node_id, artifacts);
    }

    Ok(results)
}
