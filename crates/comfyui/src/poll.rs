//! Bounded polling loop for prompt completion.
//!
//! Drives one prompt from submission to first-observed terminal
//! success by querying the history endpoint at a fixed cadence, under
//! a wall-clock budget. The only suspension point is the sleep between
//! checks; a status query in flight cannot be interrupted.

use std::future::Future;
use std::time::Duration;

use crate::api::{ComfyUIApi, ComfyUIApiError};
use crate::history::{HistoryResponse, OutputRef};

/// Errors from the polling loop.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// A zero interval would spin without ever advancing the budget.
    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    /// The budget elapsed without observing terminal success.
    #[error("Generation did not complete within {waited_secs} seconds")]
    Timeout { waited_secs: u64 },
}

/// Poll until the history entry for `prompt_id` reports terminal
/// success, sleeping `interval` before every status query.
///
/// Elapsed time is accounted as a sum of fixed `interval` increments,
/// not measured wall-clock deltas: the first query happens `interval`
/// after the call, and query latency is not charged against
/// `max_wait`. A failed status query, an unparseable body, or a
/// response missing the prompt id all read the same as "still
/// running" -- the loop keeps waiting and only the budget bounds it.
///
/// On terminal success, returns every output reference in the entry
/// immediately. The list may be empty; callers must treat that as a
/// failed generation. Issues at most `ceil(max_wait / interval) + 1`
/// status queries before returning.
pub async fn poll_until_complete<F, Fut>(
    prompt_id: &str,
    interval: Duration,
    max_wait: Duration,
    mut fetch_history: F,
) -> Result<Vec<OutputRef>, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<HistoryResponse, ComfyUIApiError>>,
{
    if interval.is_zero() {
        return Err(PollError::ZeroInterval);
    }

    let mut elapsed = Duration::ZERO;
    while elapsed < max_wait {
        tokio::time::sleep(interval).await;
        elapsed += interval;

        match fetch_history().await {
            Ok(history) => match history.get(prompt_id) {
                Some(entry) if entry.is_terminal_success() => {
                    tracing::info!(
                        prompt_id,
                        outputs = entry.output_refs().len(),
                        "Generation completed",
                    );
                    return Ok(entry.output_refs());
                }
                Some(entry) => {
                    tracing::debug!(
                        prompt_id,
                        status = %entry.status.status_str,
                        "Generation still running",
                    );
                }
                None => {
                    tracing::debug!(prompt_id, "Prompt not in history yet");
                }
            },
            Err(e) => {
                // Indistinguishable from "still running": the deadline
                // is the only bound on repeated query failures.
                tracing::warn!(prompt_id, error = %e, "Status query failed");
            }
        }
    }

    Err(PollError::Timeout {
        waited_secs: max_wait.as_secs(),
    })
}

impl ComfyUIApi {
    /// Poll this server's history endpoint for `prompt_id`.
    ///
    /// Convenience wrapper over [`poll_until_complete`] using
    /// [`ComfyUIApi::get_history`] as the status source.
    pub async fn poll_until_complete(
        &self,
        prompt_id: &str,
        interval: Duration,
        max_wait: Duration,
    ) -> Result<Vec<OutputRef>, PollError> {
        poll_until_complete(prompt_id, interval, max_wait, || {
            self.get_history(prompt_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    /// A scripted status source: pops one canned response per query
    /// and counts how many queries were issued.
    struct Script {
        responses: RefCell<VecDeque<Result<serde_json::Value, ComfyUIApiError>>>,
        queries: Cell<u32>,
    }

    impl Script {
        fn new(
            responses: impl IntoIterator<Item = Result<serde_json::Value, ComfyUIApiError>>,
        ) -> Self {
            Self {
                responses: RefCell::new(responses.into_iter().collect()),
                queries: Cell::new(0),
            }
        }

        fn fetch(&self) -> impl Future<Output = Result<HistoryResponse, ComfyUIApiError>> {
            self.queries.set(self.queries.get() + 1);
            let next = self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({})));
            async move { next.map(|value| serde_json::from_value(value).unwrap()) }
        }
    }

    fn running() -> Result<serde_json::Value, ComfyUIApiError> {
        Ok(json!({
            "abc123": { "status": { "status_str": "running", "completed": false } }
        }))
    }

    fn succeeded() -> Result<serde_json::Value, ComfyUIApiError> {
        Ok(json!({
            "abc123": {
                "status": { "status_str": "success", "completed": true },
                "outputs": {
                    "9": { "images": [ { "filename": "img_001.png", "subfolder": "" } ] }
                }
            }
        }))
    }

    fn server_error() -> Result<serde_json::Value, ComfyUIApiError> {
        Err(ComfyUIApiError::Api {
            status: 500,
            body: "boom".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn returns_outputs_after_third_query() {
        let script = Script::new([running(), running(), succeeded()]);

        let outputs = poll_until_complete(
            "abc123",
            Duration::from_secs(5),
            Duration::from_secs(300),
            || script.fetch(),
        )
        .await
        .unwrap();

        assert_eq!(script.queries.get(), 3);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].filename, "img_001.png");
        assert_eq!(outputs[0].subfolder, "");
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_exactly_two_queries() {
        let script = Script::new([running(), running(), running()]);

        let err = poll_until_complete(
            "abc123",
            Duration::from_secs(5),
            Duration::from_secs(10),
            || script.fetch(),
        )
        .await
        .unwrap_err();

        assert_eq!(script.queries.get(), 2);
        assert_matches!(err, PollError::Timeout { waited_secs: 10 });
    }

    #[tokio::test(start_paused = true)]
    async fn transient_query_failures_do_not_abort_the_poll() {
        let script = Script::new([server_error(), server_error(), succeeded()]);

        let outputs = poll_until_complete(
            "abc123",
            Duration::from_secs(5),
            Duration::from_secs(300),
            || script.fetch(),
        )
        .await
        .unwrap();

        assert_eq!(script.queries.get(), 3);
        assert_eq!(outputs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn every_query_failing_still_ends_in_timeout() {
        let script = Script::new([server_error(), server_error(), server_error()]);

        let err = poll_until_complete(
            "abc123",
            Duration::from_secs(10),
            Duration::from_secs(30),
            || script.fetch(),
        )
        .await
        .unwrap_err();

        assert_eq!(script.queries.get(), 3);
        assert_matches!(err, PollError::Timeout { .. });
    }

    #[tokio::test(start_paused = true)]
    async fn missing_prompt_id_reads_as_still_running() {
        let script = Script::new([Ok(json!({})), succeeded()]);

        let outputs = poll_until_complete(
            "abc123",
            Duration::from_secs(5),
            Duration::from_secs(300),
            || script.fetch(),
        )
        .await
        .unwrap();

        assert_eq!(script.queries.get(), 2);
        assert_eq!(outputs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_with_no_outputs_is_an_empty_list_not_an_error() {
        let script = Script::new([Ok(json!({
            "abc123": {
                "status": { "status_str": "success", "completed": true },
                "outputs": {}
            }
        }))]);

        let outputs = poll_until_complete(
            "abc123",
            Duration::from_secs(5),
            Duration::from_secs(300),
            || script.fetch(),
        )
        .await
        .unwrap();

        assert!(outputs.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_wait_times_out_without_querying() {
        let script = Script::new([]);

        let err = poll_until_complete(
            "abc123",
            Duration::from_secs(5),
            Duration::ZERO,
            || script.fetch(),
        )
        .await
        .unwrap_err();

        assert_eq!(script.queries.get(), 0);
        assert_matches!(err, PollError::Timeout { waited_secs: 0 });
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let script = Script::new([]);

        let err = poll_until_complete(
            "abc123",
            Duration::ZERO,
            Duration::from_secs(300),
            || script.fetch(),
        )
        .await
        .unwrap_err();

        assert_eq!(script.queries.get(), 0);
        assert_matches!(err, PollError::ZeroInterval);
    }

    #[tokio::test(start_paused = true)]
    async fn query_count_is_bounded_by_budget_over_interval() {
        // interval 3s, max_wait 10s: queries land at 3, 6, 9, 12.
        let script = Script::new([running(), running(), running(), running(), running()]);

        let err = poll_until_complete(
            "abc123",
            Duration::from_secs(3),
            Duration::from_secs(10),
            || script.fetch(),
        )
        .await
        .unwrap_err();

        assert_eq!(script.queries.get(), 4);
        assert_matches!(err, PollError::Timeout { .. });
    }
}
