//! Polling loop for asynchronous text detection jobs.
//!
//! Per job the machine is `Submitted -> Polling -> {Succeeded | Failed |
//! TimedOut}`; polling is the only non-terminal state and once a terminal
//! status is observed the job is never queried again. Between polls the
//! loop suspends on an async timer, so dropping the enclosing request
//! future (client disconnect) cancels the poll at the next await point.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::clients::TextDetector;
use crate::error::PipelineError;
use crate::models::{JobOutcome, JobStatus};

/// Timing knobs for one polling loop.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay between consecutive status queries.
    pub interval: Duration,
    /// Total budget before the job counts as timed out.
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Poll a job until it reaches a terminal status or the timeout elapses.
///
/// Succeeds only on a `succeeded` observation. `failed`, `partial`, and
/// timeout all map to a job-failed error carrying which outcome occurred.
/// A status query that itself errors is terminal for the whole poll; the
/// loop's own repetition is the only retry mechanism.
pub async fn poll_job(
    detector: &dyn TextDetector,
    job_id: &str,
    config: PollConfig,
) -> Result<(), PipelineError> {
    let deadline = Instant::now() + config.timeout;

    loop {
        let status = detector.status(job_id).await.map_err(|e| {
            error!(job_id, error = %e, "status query failed");
            PipelineError::JobFailed {
                job_id: job_id.to_string(),
                outcome: JobOutcome::Failed,
            }
        })?;

        debug!(job_id, ?status, "job status");

        match status {
            JobStatus::Succeeded => return Ok(()),
            JobStatus::Failed => {
                return Err(PipelineError::JobFailed {
                    job_id: job_id.to_string(),
                    outcome: JobOutcome::Failed,
                })
            }
            JobStatus::Partial => {
                return Err(PipelineError::JobFailed {
                    job_id: job_id.to_string(),
                    outcome: JobOutcome::Partial,
                })
            }
            JobStatus::Pending => {
                if Instant::now() + config.interval > deadline {
                    warn!(job_id, timeout_secs = config.timeout.as_secs(), "job timed out");
                    return Err(PipelineError::JobFailed {
                        job_id: job_id.to_string(),
                        outcome: JobOutcome::TimedOut,
                    });
                }
                tokio::time::sleep(config.interval).await;
            }
        }
    }
}
