//! Unified generation run: submit, poll, deliver, record.
//!
//! Per job the flow is `Created -> Submitted -> Polling ->
//! {Succeeded, TimedOut, Failed}`, with `Succeeded` fanning out to
//! delivered or delivery-failed depending on the sink. All terminal
//! states are final: one attempt end to end, no retry, no resumption.

use std::time::Duration;

use newsart_comfyui::api::{ComfyUIApi, ComfyUIApiError};
use newsart_comfyui::history::OutputRef;
use newsart_comfyui::poll::PollError;
use newsart_core::error::CoreError;
use newsart_core::naming;
use newsart_core::workflow::WorkflowTemplate;
use newsart_core::DbId;
use newsart_db::models::Article;
use newsart_db::repositories::ArticleRepo;
use newsart_db::DbPool;

use crate::prompt;
use crate::sink::{ArtifactSink, FtpSettings, FtpSink};

/// Tunables for one generation job.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Pause between status queries.
    pub interval: Duration,
    /// Total poll budget.
    pub max_wait: Duration,
    pub width: u32,
    pub height: u32,
    pub batch_size: u32,
    /// Node id whose `text` input receives the prompt.
    pub prompt_node: String,
    /// Node id carrying the width/height/batch_size inputs.
    pub dimensions_node: String,
}

/// A successfully delivered artifact.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    /// The output reference the server reported.
    pub source: OutputRef,
    /// Location reported by the sink (path or public URL).
    pub location: String,
}

/// Terminal result of a database-backed run.
#[derive(Debug)]
pub enum Outcome {
    /// An article was processed and its image location recorded.
    Completed { article_id: DbId, location: String },
    /// Generation or delivery failed; the message was recorded on the
    /// article row.
    Failed { article_id: DbId, message: String },
    /// No article is waiting for an image.
    NothingToDo,
}

/// Errors from the generation pipeline.
///
/// Exactly one of these is produced per failed run. The database
/// variant flattens it to a human-readable message on the article row;
/// the row does not distinguish which stage failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Network-level failure reaching the generation server.
    #[error("Transport error: {0}")]
    Transport(reqwest::Error),

    /// The server was reachable but rejected the submission.
    #[error("Submission failed ({status}): {body}")]
    Submission { status: u16, body: String },

    /// Submission was accepted without a usable job handle.
    #[error("Submission returned an empty prompt id")]
    MissingHandle,

    /// The poll budget elapsed without terminal success.
    #[error(transparent)]
    Poll(#[from] PollError),

    /// The job succeeded but produced no outputs.
    #[error("Generation succeeded but produced no outputs")]
    NoOutputs,

    /// Artifact fetch or sink write failed after success was observed.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Workflow template mutation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error while selecting or updating the article row.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ComfyUIApiError> for PipelineError {
    fn from(e: ComfyUIApiError) -> Self {
        match e {
            ComfyUIApiError::Request(e) => PipelineError::Transport(e),
            ComfyUIApiError::Api { status, body } => PipelineError::Submission { status, body },
            ComfyUIApiError::EmptyPromptId => PipelineError::MissingHandle,
        }
    }
}

/// Drive one workflow from submission to first delivered artifact.
///
/// The workflow must be fully prepared by the caller (prompt text and
/// dimensions already set). On terminal success the FIRST output
/// reference is fetched and handed to the sink; any further outputs
/// are discarded with a warning. The first delivery attempt is final,
/// success or failure -- there is no fallback to a second output.
pub async fn run_job(
    api: &ComfyUIApi,
    workflow: &serde_json::Value,
    interval: Duration,
    max_wait: Duration,
    sink: &dyn ArtifactSink,
) -> Result<StoredArtifact, PipelineError> {
    let prompt_id = api.submit_workflow(workflow).await?;
    tracing::info!(%prompt_id, "Workflow queued");

    let outputs = api.poll_until_complete(&prompt_id, interval, max_wait).await?;
    let Some(output) = outputs.first().cloned() else {
        return Err(PipelineError::NoOutputs);
    };
    if outputs.len() > 1 {
        tracing::warn!(
            %prompt_id,
            discarded = outputs.len() - 1,
            "Job produced multiple outputs; delivering the first only",
        );
    }

    let bytes = api
        .fetch_output(&output)
        .await
        .map_err(|e| PipelineError::Delivery(e.to_string()))?;
    let location = sink
        .store(&output.filename, &bytes)
        .await
        .map_err(|e| PipelineError::Delivery(e.to_string()))?;

    tracing::info!(filename = %output.filename, %location, "Artifact delivered");
    Ok(StoredArtifact {
        source: output,
        location,
    })
}

/// Run one prepared-prompt generation outside the database flow.
///
/// Sets the dimensions (and the prompt text, when given) on a copy of
/// the template and runs the job against the supplied sink.
pub async fn run_standalone(
    api: &ComfyUIApi,
    template: &WorkflowTemplate,
    settings: &JobSettings,
    prompt_text: Option<&str>,
    sink: &dyn ArtifactSink,
) -> Result<StoredArtifact, PipelineError> {
    let mut workflow = template.clone();
    if let Some(text) = prompt_text {
        workflow.set_prompt_text(&settings.prompt_node, text)?;
    }
    workflow.set_dimensions(
        &settings.dimensions_node,
        settings.width,
        settings.height,
        settings.batch_size,
    )?;

    run_job(api, workflow.as_value(), settings.interval, settings.max_wait, sink).await
}

/// Pick the next article without an image, generate its illustration,
/// upload it to FTP, and record the result.
///
/// Exactly one of `image_url` / `error_message` is written per run:
/// the stored public location on success, the rendered error message
/// on ANY terminal failure (submission, timeout, no outputs,
/// delivery). Re-processing is prevented only by the `IS NULL`
/// selection guard.
pub async fn process_next_article(
    pool: &DbPool,
    api: &ComfyUIApi,
    template: &WorkflowTemplate,
    settings: &JobSettings,
    ftp: &FtpSettings,
) -> Result<Outcome, PipelineError> {
    let Some(article) = ArticleRepo::next_without_image(pool).await? else {
        tracing::info!("No articles waiting for an image");
        return Ok(Outcome::NothingToDo);
    };
    tracing::info!(article_id = article.id, title = %article.title, "Processing article");

    match generate_for_article(api, template, settings, ftp, &article).await {
        Ok(stored) => {
            ArticleRepo::set_image_url(pool, article.id, &stored.location).await?;
            tracing::info!(
                article_id = article.id,
                location = %stored.location,
                "Image location recorded",
            );
            Ok(Outcome::Completed {
                article_id: article.id,
                location: stored.location,
            })
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!(article_id = article.id, error = %message, "Generation failed");
            ArticleRepo::set_error_message(pool, article.id, &message).await?;
            Ok(Outcome::Failed {
                article_id: article.id,
                message,
            })
        }
    }
}

/// Build the styled workflow and dated FTP sink for one article, then
/// run the job.
async fn generate_for_article(
    api: &ComfyUIApi,
    template: &WorkflowTemplate,
    settings: &JobSettings,
    ftp: &FtpSettings,
    article: &Article,
) -> Result<StoredArtifact, PipelineError> {
    let style = prompt::random_style();
    let text = prompt::styled_prompt(style, &article.title);
    tracing::debug!(article_id = article.id, %style, "Prompt assembled");

    let mut workflow = template.clone();
    workflow.set_prompt_text(&settings.prompt_node, &text)?;
    workflow.set_dimensions(
        &settings.dimensions_node,
        settings.width,
        settings.height,
        settings.batch_size,
    )?;

    let sink = FtpSink::new(ftp.clone(), naming::month_folder(&article.created_at))
        .with_file_name(naming::article_image_filename(&article.title));

    run_job(api, workflow.as_value(), settings.interval, settings.max_wait, &sink).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_submission_errors_map_to_distinct_variants() {
        let e: PipelineError = ComfyUIApiError::Api {
            status: 400,
            body: "bad workflow".to_string(),
        }
        .into();
        assert!(matches!(
            e,
            PipelineError::Submission { status: 400, .. }
        ));

        let e: PipelineError = ComfyUIApiError::EmptyPromptId.into();
        assert!(matches!(e, PipelineError::MissingHandle));
    }

    #[test]
    fn errors_render_human_readable_messages() {
        let e = PipelineError::Poll(PollError::Timeout { waited_secs: 300 });
        assert_eq!(
            e.to_string(),
            "Generation did not complete within 300 seconds"
        );

        let e = PipelineError::Submission {
            status: 500,
            body: "internal".to_string(),
        };
        assert_eq!(e.to_string(), "Submission failed (500): internal");

        let e = PipelineError::NoOutputs;
        assert_eq!(e.to_string(), "Generation succeeded but produced no outputs");
    }
}
