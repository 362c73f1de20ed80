//! Typed view of the ComfyUI `/history/{prompt_id}` document.
//!
//! ```text
//! { "<prompt_id>": { "outputs": { "<node_id>": { "images": [ {filename, subfolder, type} ] } } } }
//! ```
//!
//! Output nodes keep the order the server lists them in.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The full history response, keyed by prompt ID.
pub type HistoryResponse = IndexMap<String, HistoryEntry>;

/// History of a single prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub outputs: IndexMap<String, NodeOutput>,
}

/// Outputs recorded for one node. Non-image outputs are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<ArtifactRef>,
}

/// Reference to one remote file, as accepted by `GET /view`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    /// Storage kind (`output`, `temp`, `input`).
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "output".to_string()
}
