//! REST client for the ComfyUI HTTP endpoints.
//!
//! Wraps workflow submission, history retrieval, and artifact download
//! using [`reqwest`]. One instance targets one ComfyUI server.

use serde::Deserialize;

use crate::history::{HistoryResponse, OutputRef};

/// HTTP client for a single ComfyUI server.
pub struct ComfyUIApi {
    client: reqwest::Client,
    base_url: String,
}

/// Response returned by the ComfyUI `/prompt` endpoint after
/// successfully queuing a workflow.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    /// Server-assigned identifier for the queued prompt.
    prompt_id: String,
}

/// Errors from the ComfyUI REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Submission was accepted but the response carried no usable
    /// prompt id.
    #[error("ComfyUI returned an empty prompt id")]
    EmptyPromptId,
}

impl ComfyUIApi {
    /// Create a new API client for a ComfyUI server.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://localhost:8888`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// Base HTTP URL of the server (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a workflow for execution.
    ///
    /// Sends a `POST /prompt` request with the workflow wrapped as
    /// `{"prompt": <workflow>}` and returns the server-assigned prompt
    /// id. Never returns an empty id: a response without one is an
    /// [`ComfyUIApiError::EmptyPromptId`]. Submission failures are
    /// terminal; there is no retry.
    pub async fn submit_workflow(
        &self,
        workflow: &serde_json::Value,
    ) -> Result<String, ComfyUIApiError> {
        let body = serde_json::json!({ "prompt": workflow });

        let response = self
            .client
            .post(format!("{}/prompt", self.base_url))
            .json(&body)
            .send()
            .await?;

        let submit: SubmitResponse = Self::parse_response(response).await?;
        if submit.prompt_id.is_empty() {
            return Err(ComfyUIApiError::EmptyPromptId);
        }
        Ok(submit.prompt_id)
    }

    /// Retrieve execution history for a specific prompt.
    ///
    /// Sends a `GET /history/{prompt_id}` request. While the prompt is
    /// still queued or running the returned map may not contain the
    /// prompt id at all.
    pub async fn get_history(&self, prompt_id: &str) -> Result<HistoryResponse, ComfyUIApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.base_url, prompt_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download one generated artifact, fully buffered.
    ///
    /// Sends a `GET /view?filename=...&type=output&subfolder=...`
    /// request and returns the whole byte payload.
    pub async fn fetch_output(&self, output: &OutputRef) -> Result<Vec<u8>, ComfyUIApiError> {
        let response = self
            .client
            .get(format!("{}/view", self.base_url))
            .query(&[
                ("filename", output.filename.as_str()),
                ("type", "output"),
                ("subfolder", output.subfolder.as_str()),
            ])
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyUIApiError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUIApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUIApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUIApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let api = ComfyUIApi::new("http://localhost:8888//");
        assert_eq!(api.base_url(), "http://localhost:8888");
    }
}
