//! Fixed-interval job status polling
//!
//! A submitted job is observed until it reaches a terminal status:
//!
//! ```text
//! Submitted -> Polling -> Succeeded
//!                     \-> Failed
//!                     \-> TimedOut   (only when a timeout is configured)
//! ```
//!
//! Between fetches the task sleeps for exactly the configured interval.
//! A status-fetch error ends the wait immediately unless `status_retries`
//! allows retrying transient failures.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{LoadError, Result};
use crate::protocol::types::{JobDetail, JobKind, JobStatus};
use crate::protocol::JobService;

/// How often and how long to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` waits until the job is terminal
    pub timeout: Option<Duration>,
    /// Consecutive transient fetch failures tolerated before giving up
    pub status_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: None,
            status_retries: 0,
        }
    }
}

/// Client-side view of a job being waited on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Succeeded | PollState::Failed | PollState::TimedOut
        )
    }

    /// State after observing `status`
    fn observe(self, status: &JobStatus) -> PollState {
        if self.is_terminal() {
            return self;
        }
        match status {
            JobStatus::Succeeded => PollState::Succeeded,
            JobStatus::Failed => PollState::Failed,
            _ => PollState::Polling,
        }
    }
}

/// Waits for jobs to finish
#[derive(Clone)]
pub struct JobPoller {
    jobs: Arc<dyn JobService>,
    settings: PollSettings,
}

impl JobPoller {
    pub fn new(jobs: Arc<dyn JobService>, settings: PollSettings) -> Self {
        Self { jobs, settings }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Poll `job_id` until it succeeds, fails, or the timeout passes
    ///
    /// Returns the final detail on success. A FAILED job becomes
    /// [`LoadError::JobFailed`] with the backend message; running out of time
    /// becomes [`LoadError::Timeout`].
    pub async fn poll(&self, job_id: &str, kind: JobKind) -> Result<JobDetail> {
        let start = Instant::now();
        let mut state = PollState::Submitted;
        let mut fetches = 0u32;

        loop {
            let detail = self.fetch(job_id, kind).await?;
            fetches += 1;

            let next = state.observe(&detail.status);
            if next != state {
                debug!(job = job_id, "Job state {:?} -> {:?}", state, next);
            }
            state = next;
            debug!(job = job_id, status = %detail.status, fetches, "Job status");

            match state {
                PollState::Succeeded => {
                    info!("Job {} completed successfully", job_id);
                    return Ok(detail);
                }
                PollState::Failed => {
                    let message = detail
                        .message
                        .unwrap_or_else(|| "Unknown error".to_string());
                    error!("Job {} failed: {}", job_id, message);
                    return Err(LoadError::JobFailed {
                        job_id: job_id.to_string(),
                        message,
                    });
                }
                _ => {}
            }

            if let Some(timeout) = self.settings.timeout {
                let elapsed = start.elapsed();
                if elapsed > timeout {
                    debug!(job = job_id, "Job state {:?} -> {:?}", state, PollState::TimedOut);
                    return Err(LoadError::Timeout {
                        job_id: job_id.to_string(),
                        waited_secs: elapsed.as_secs(),
                    });
                }
            }

            tokio::time::sleep(self.settings.interval).await;
        }
    }

    /// One status fetch, retrying transient failures if configured
    async fn fetch(&self, job_id: &str, kind: JobKind) -> Result<JobDetail> {
        let mut attempt = 0u32;
        loop {
            match self.jobs.job_status(job_id, kind).await {
                Ok(detail) => return Ok(detail),
                Err(e) if e.is_transient() && attempt < self.settings.status_retries => {
                    attempt += 1;
                    warn!(
                        "Status check for job {} failed ({}), retry {} of {}",
                        job_id, e, attempt, self.settings.status_retries
                    );
                    tokio::time::sleep(self.settings.interval).await;
                }
                Err(e) => {
                    error!("Error polling job status: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
