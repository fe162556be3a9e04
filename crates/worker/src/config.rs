//! Worker configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use newsart_pipeline::{FtpSettings, JobSettings};

/// Which sink receives the artifact in a standalone (database-less) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkChoice {
    /// Write into a local directory.
    Local,
    /// Upload to the configured FTP server.
    Ftp,
}

/// Worker configuration.
///
/// All environment-specific literals -- hosts, credentials, paths,
/// node ids -- live here; nothing is embedded at the call sites. All
/// fields have defaults suitable for a local ComfyUI instance.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// ComfyUI base URL.
    pub comfyui_url: String,
    /// Path to the workflow template JSON.
    pub workflow_path: PathBuf,
    /// Postgres URL; absent means a standalone run without article
    /// tracking.
    pub database_url: Option<String>,
    /// Prompt text for standalone runs. Ignored in database mode,
    /// where the prompt is built from the article title.
    pub prompt_text: Option<String>,
    /// Sink used by standalone runs.
    pub sink: SinkChoice,
    /// Target directory of the local sink.
    pub output_dir: PathBuf,
    pub job: JobSettings,
    pub ftp: FtpSettings,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                  |
    /// |----------------------|--------------------------|
    /// | `COMFYUI_URL`        | `http://localhost:8888`  |
    /// | `WORKFLOW_PATH`      | `workflow_api.json`      |
    /// | `DATABASE_URL`       | (unset)                  |
    /// | `GENERATION_PROMPT`  | (unset)                  |
    /// | `SINK`               | `local`                  |
    /// | `OUTPUT_DIR`         | `output`                 |
    /// | `POLL_INTERVAL_SECS` | `5`                      |
    /// | `POLL_MAX_WAIT_SECS` | `300`                    |
    /// | `IMAGE_WIDTH`        | `1024`                   |
    /// | `IMAGE_HEIGHT`       | `512`                    |
    /// | `BATCH_SIZE`         | `1`                      |
    /// | `PROMPT_NODE`        | `6`                      |
    /// | `DIMENSIONS_NODE`    | `5`                      |
    /// | `FTP_HOST`           | `localhost`              |
    /// | `FTP_PORT`           | `21`                     |
    /// | `FTP_USER`           | `anonymous`              |
    /// | `FTP_PASSWORD`       | (empty)                  |
    /// | `FTP_BASE_DIR`       | `/ftp/images`            |
    /// | `FTP_PUBLIC_PREFIX`  | `/images`                |
    pub fn from_env() -> Self {
        let comfyui_url =
            std::env::var("COMFYUI_URL").unwrap_or_else(|_| "http://localhost:8888".into());

        let workflow_path: PathBuf = std::env::var("WORKFLOW_PATH")
            .unwrap_or_else(|_| "workflow_api.json".into())
            .into();

        let database_url = std::env::var("DATABASE_URL").ok();
        let prompt_text = std::env::var("GENERATION_PROMPT").ok();

        let sink = match std::env::var("SINK").as_deref() {
            Ok("ftp") => SinkChoice::Ftp,
            Ok("local") | Err(_) => SinkChoice::Local,
            Ok(other) => panic!("SINK must be `local` or `ftp`, got `{other}`"),
        };

        let output_dir: PathBuf = std::env::var("OUTPUT_DIR")
            .unwrap_or_else(|_| "output".into())
            .into();

        let job = JobSettings {
            interval: Duration::from_secs(env_parse("POLL_INTERVAL_SECS", 5)),
            max_wait: Duration::from_secs(env_parse("POLL_MAX_WAIT_SECS", 300)),
            width: env_parse("IMAGE_WIDTH", 1024),
            height: env_parse("IMAGE_HEIGHT", 512),
            batch_size: env_parse("BATCH_SIZE", 1),
            prompt_node: std::env::var("PROMPT_NODE").unwrap_or_else(|_| "6".into()),
            dimensions_node: std::env::var("DIMENSIONS_NODE").unwrap_or_else(|_| "5".into()),
        };

        let ftp = FtpSettings {
            host: std::env::var("FTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: env_parse("FTP_PORT", 21),
            user: std::env::var("FTP_USER").unwrap_or_else(|_| "anonymous".into()),
            password: std::env::var("FTP_PASSWORD").unwrap_or_default(),
            base_dir: std::env::var("FTP_BASE_DIR").unwrap_or_else(|_| "/ftp/images".into()),
            public_prefix: std::env::var("FTP_PUBLIC_PREFIX").unwrap_or_else(|_| "/images".into()),
        };

        Self {
            comfyui_url,
            workflow_path,
            database_url,
            prompt_text,
            sink,
            output_dir,
            job,
            ftp,
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value: {e}")),
        Err(_) => default,
    }
}
