//! HTTP client for a ComfyUI image-generation server.
//!
//! Wraps the three endpoints the pipeline drives: workflow submission
//! (`POST /prompt`), execution history (`GET /history/{prompt_id}`),
//! and artifact download (`GET /view`). ComfyUI exposes no completion
//! callback over plain HTTP, so completion is detected by polling the
//! history endpoint under a wall-clock budget; see [`poll`].

pub mod api;
pub mod history;
pub mod poll;

pub use api::{ComfyUIApi, ComfyUIApiError};
pub use history::{HistoryEntry, HistoryResponse, OutputRef};
pub use poll::{poll_until_complete, PollError};
