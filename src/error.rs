//! Typed errors for the extraction pipeline.

use thiserror::Error;

use crate::models::JobOutcome;

/// Errors that can abort a pipeline run.
///
/// Storage, submission, polling, and result-fetch failures each surface as
/// their own kind so callers and logs can tell them apart. Entity detection
/// failures are never represented here - the pipeline downgrades them to an
/// empty entity list.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("storage upload failed: {0}")]
    Storage(String),

    #[error("failed to start text detection job: {0}")]
    JobSubmission(String),

    #[error("text detection job {job_id} {outcome}")]
    JobFailed { job_id: String, outcome: JobOutcome },

    #[error("failed to fetch text detection results: {0}")]
    ResultFetch(String),

    #[error("malformed service response: {0}")]
    MalformedResponse(String),

    #[error("internal processing error: {0}")]
    Internal(#[from] anyhow::Error),
}
