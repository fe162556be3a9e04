//! Typed model of the ComfyUI `/history/{prompt_id}` response.
//!
//! The response is a mapping keyed by prompt id. Each entry carries a
//! status block and per-node outputs. Fields the pipeline does not
//! read are ignored during deserialization, and everything the server
//! may omit while a prompt is still queued defaults to empty.

use std::collections::HashMap;

use serde::Deserialize;

/// History response body: prompt id -> execution record.
///
/// A prompt that has not reached the history yet is simply absent
/// from the map.
pub type HistoryResponse = HashMap<String, HistoryEntry>;

/// One execution record from the history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub status: EntryStatus,
    /// Per-node outputs, keyed by node id.
    #[serde(default)]
    pub outputs: HashMap<String, NodeOutput>,
}

/// Status block of a history entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryStatus {
    /// Human-readable status; `"success"` on terminal success.
    #[serde(default)]
    pub status_str: String,
    /// Set once the server has finished executing the prompt.
    #[serde(default)]
    pub completed: bool,
}

/// Outputs produced by a single node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<OutputRef>,
}

/// Locates one generated artifact on the originating server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
}

impl HistoryEntry {
    /// Terminal success: explicit success status AND completion flag.
    ///
    /// Anything else -- queued, running, failed, or a malformed status
    /// block -- reads as "not done yet" to the poller.
    pub fn is_terminal_success(&self) -> bool {
        self.status.status_str == "success" && self.status.completed
    }

    /// Collect every output reference across all node outputs.
    pub fn output_refs(&self) -> Vec<OutputRef> {
        self.outputs
            .values()
            .flat_map(|node| node.images.iter().cloned())
            .collect()
    }
}
