//! ComfyUI workflow (API format) as an opaque, validated job description.
//!
//! A workflow is a JSON object mapping node IDs to node definitions. The
//! only structure enforced here is that the object is non-empty and that
//! every node is itself an object carrying an `inputs` field. Everything
//! else about the graph is left to the ComfyUI server.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Template node mapping
// ---------------------------------------------------------------------------

/// Node carrying the positive prompt text in the default template.
pub const POSITIVE_PROMPT_NODE: &str = "74";
/// Node carrying the negative prompt text in the default template.
pub const NEGATIVE_PROMPT_NODE: &str = "75";
/// Sampler node carrying the seed in the default template.
pub const SAMPLER_NODE: &str = "72";

// ---------------------------------------------------------------------------
// Limits and defaults
// ---------------------------------------------------------------------------

/// Seed value that requests a randomly chosen seed.
pub const RANDOM_SEED: i64 = -1;

/// Upper bound for generated seeds (largest integer exactly representable
/// in a JSON double, so the seed survives any JS client untouched).
pub const MAX_RANDOM_SEED: i64 = (1 << 53) - 1;

/// Default overall generation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Longest caller-supplied generation timeout in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

// ---------------------------------------------------------------------------
// JobDescription
// ---------------------------------------------------------------------------

/// A validated ComfyUI workflow ready to be submitted via `POST /prompt`.
///
/// Construct with [`JobDescription::from_value`] (or deserialize, which
/// runs the same validation). Serializes transparently back to the
/// original JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct JobDescription {
    nodes: Map<String, Value>,
}

impl JobDescription {
    /// Validate a raw JSON value and wrap it.
    ///
    /// Fails with [`CoreError::Validation`] if the value is not an object,
    /// is empty, or contains a node that is not an object with `inputs`.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let Value::Object(nodes) = value else {
            return Err(CoreError::Validation(
                "Workflow must be a JSON object".to_string(),
            ));
        };

        if nodes.is_empty() {
            return Err(CoreError::Validation(
                "Workflow must contain at least one node".to_string(),
            ));
        }

        for (node_id, node) in &nodes {
            let Some(node) = node.as_object() else {
                return Err(CoreError::Validation(format!(
                    "Node '{node_id}' must be a JSON object"
                )));
            };
            if !node.contains_key("inputs") {
                return Err(CoreError::Validation(format!(
                    "Node '{node_id}' is missing 'inputs'"
                )));
            }
        }

        Ok(Self { nodes })
    }

    /// Number of nodes in the workflow.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; validation rejects empty workflows.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Read a single input value of a node.
    pub fn input(&self, node_id: &str, input: &str) -> Option<&Value> {
        self.nodes.get(node_id)?.get("inputs")?.get(input)
    }

    /// Overwrite a single input of an existing node.
    ///
    /// Returns `false` (and leaves the workflow untouched) when the node
    /// does not exist. A non-object `inputs` field is replaced by an
    /// object holding only the new input.
    pub fn set_input(&mut self, node_id: &str, input: &str, value: Value) -> bool {
        let Some(node) = self.nodes.get_mut(node_id).and_then(Value::as_object_mut) else {
            return false;
        };

        let inputs = node
            .entry("inputs")
            .or_insert_with(|| Value::Object(Map::new()));
        if !inputs.is_object() {
            *inputs = Value::Object(Map::new());
        }
        if let Some(inputs) = inputs.as_object_mut() {
            inputs.insert(input.to_string(), value);
        }
        true
    }
}

impl TryFrom<Value> for JobDescription {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<JobDescription> for Value {
    fn from(job: JobDescription) -> Self {
        Value::Object(job.nodes)
    }
}

// ---------------------------------------------------------------------------
// Parameter overlay
// ---------------------------------------------------------------------------

/// User-facing generation parameters overlaid onto the default template.
#[derive(Debug, Clone, Default)]
pub struct WorkflowParams {
    pub positive_prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub seed: Option<i64>,
}

/// Overlay generation parameters onto a template workflow.
///
/// Each parameter is written only if its target node exists in the
/// template; missing nodes are skipped silently.
pub fn apply_params(workflow: &mut JobDescription, params: &WorkflowParams) {
    if let Some(ref text) = params.positive_prompt {
        workflow.set_input(POSITIVE_PROMPT_NODE, "text", Value::from(text.as_str()));
    }
    if let Some(ref text) = params.negative_prompt {
        workflow.set_input(NEGATIVE_PROMPT_NODE, "text", Value::from(text.as_str()));
    }
    if let Some(seed) = params.seed {
        workflow.set_input(SAMPLER_NODE, "seed", Value::from(seed));
    }
}

/// Resolve the [`RANDOM_SEED`] sentinel to a concrete seed.
///
/// Non-negative seeds pass through unchanged; any negative seed is
/// treated as a request for a random one.
pub fn resolve_seed(seed: i64) -> i64 {
    if seed >= 0 {
        seed
    } else {
        rand::rng().random_range(0..=MAX_RANDOM_SEED)
    }
}

/// Validate a caller-supplied generation timeout.
pub fn validate_timeout_secs(timeout_secs: u64) -> Result<(), CoreError> {
    if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
        return Err(CoreError::Validation(format!(
            "timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds"
        )));
    }
    Ok(())
}
