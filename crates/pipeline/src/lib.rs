//! Generation pipeline: one job from submission to delivered artifact.
//!
//! Ties the ComfyUI client, the delivery sinks, and the article
//! repository together. [`run::run_job`] is the reusable
//! submit-poll-deliver flow; [`run::process_next_article`] wraps it
//! with article selection, prompt styling, and result recording.

pub mod prompt;
pub mod run;
pub mod sink;

pub use run::{process_next_article, run_job, run_standalone, JobSettings, Outcome, PipelineError, StoredArtifact};
pub use sink::{ArtifactSink, FtpSettings, FtpSink, LocalDirSink, SinkError};
