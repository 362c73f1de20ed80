//! ComfyUI WebSocket message types and parser.
//!
//! ComfyUI sends JSON text frames shaped `{"type": "<kind>", "data": {...}}`.
//! Only a handful of kinds matter to a job waiting for completion; the
//! rest are reported as [`MessageError::Unhandled`] so the caller can skip
//! them quietly instead of treating them as malformed.

use serde::Deserialize;

/// Message kinds understood by [`parse_message`].
const HANDLED_TYPES: &[&str] = &[
    "status",
    "execution_start",
    "executing",
    "progress",
    "execution_success",
    "execution_error",
    "execution_interrupted",
];

/// Known ComfyUI WebSocket messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ComfyUIMessage {
    /// Server status broadcast. Passed through opaquely.
    #[serde(rename = "status")]
    Status(serde_json::Value),

    /// A prompt has started executing.
    #[serde(rename = "execution_start")]
    ExecutionStart(PromptRef),

    /// A node is executing, or the whole prompt finished when `node` is `None`.
    #[serde(rename = "executing")]
    Executing(ExecutingData),

    /// Step-level progress from a long-running node (e.g. KSampler).
    #[serde(rename = "progress")]
    Progress(ProgressData),

    /// Sent by newer servers after the final `executing` frame.
    #[serde(rename = "execution_success")]
    ExecutionSuccess(PromptRef),

    /// Execution failed with an error.
    #[serde(rename = "execution_error")]
    ExecutionError(ErrorData),

    /// Execution was interrupted via `/interrupt`.
    #[serde(rename = "execution_interrupted")]
    ExecutionInterrupted(PromptRef),
}

/// Payload carrying only the prompt a message refers to.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRef {
    pub prompt_id: String,
}

/// Payload for `executing` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingData {
    /// Node currently executing; `None` once the whole prompt is done.
    pub node: Option<String>,
    pub prompt_id: String,
}

impl ExecutingData {
    /// The completion marker: no current node, and the prompt is ours.
    pub fn is_completion_of(&self, prompt_id: &str) -> bool {
        self.node.is_none() && self.prompt_id == prompt_id
    }
}

/// Payload for `progress` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    /// Current step number.
    pub value: i64,
    /// Total number of steps.
    pub max: i64,
    #[serde(default)]
    pub prompt_id: Option<String>,
}

/// Payload for `execution_error` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorData {
    pub prompt_id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub exception_message: String,
    #[serde(default)]
    pub exception_type: String,
}

/// Why a text frame did not yield a [`ComfyUIMessage`].
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Not JSON, no string `type`, or a known type with a bad payload.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Well-formed envelope of a kind this client does not act on.
    #[error("Unhandled message type: {0}")]
    Unhandled(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

/// Parse a ComfyUI WebSocket text frame into a typed message.
pub fn parse_message(text: &str) -> Result<ComfyUIMessage, MessageError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if !HANDLED_TYPES.contains(&envelope.kind.as_str()) {
        return Err(MessageError::Unhandled(envelope.kind));
    }
    Ok(serde_json::from_str(text)?)
}
