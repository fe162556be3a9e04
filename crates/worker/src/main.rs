//! Worker entry point.
//!
//! One invocation processes one generation job. With `DATABASE_URL`
//! set, the next article without an image is illustrated and its row
//! updated; otherwise a single standalone generation is stored to the
//! configured sink.

use newsart_comfyui::ComfyUIApi;
use newsart_core::naming;
use newsart_core::workflow::WorkflowTemplate;
use newsart_pipeline::{
    process_next_article, run_standalone, ArtifactSink, FtpSink, LocalDirSink, Outcome,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{SinkChoice, WorkerConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsart_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Run failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env();
    let api = ComfyUIApi::new(config.comfyui_url.clone());
    let template = WorkflowTemplate::load(&config.workflow_path)?;

    match &config.database_url {
        Some(url) => {
            let pool = newsart_db::create_pool(url).await?;
            newsart_db::health_check(&pool).await?;

            match process_next_article(&pool, &api, &template, &config.job, &config.ftp).await? {
                Outcome::Completed {
                    article_id,
                    location,
                } => {
                    tracing::info!(article_id, %location, "Article illustrated");
                }
                Outcome::Failed {
                    article_id,
                    message,
                } => {
                    // The failure is recorded on the row; the run
                    // itself completed.
                    tracing::warn!(article_id, %message, "Article marked as failed");
                }
                Outcome::NothingToDo => {
                    tracing::info!("Nothing to do");
                }
            }
        }
        None => {
            let sink = standalone_sink(&config);
            let stored = run_standalone(
                &api,
                &template,
                &config.job,
                config.prompt_text.as_deref(),
                sink.as_ref(),
            )
            .await?;
            tracing::info!(location = %stored.location, "Artifact stored");
        }
    }

    Ok(())
}

/// Build the sink a standalone run delivers to.
fn standalone_sink(config: &WorkerConfig) -> Box<dyn ArtifactSink> {
    match config.sink {
        SinkChoice::Local => Box::new(LocalDirSink::new(config.output_dir.clone())),
        SinkChoice::Ftp => Box::new(FtpSink::new(
            config.ftp.clone(),
            naming::month_folder(&chrono::Utc::now()),
        )),
    }
}
