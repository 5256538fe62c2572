use std::time::Duration;

use thiserror::Error;

use crate::adapter::{AdapterError, JobSnapshot, ServiceAdapter, TranscriptionStatus};

/// The poll bound was reached while the job was still running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "transcription job `{job_name}` still unresolved after {attempts} polls{}",
    last_error_suffix(.last_error)
)]
pub struct PollTimeout {
    pub job_name: String,
    pub attempts: u32,
    pub last_status: Option<TranscriptionStatus>,
    pub last_error: Option<AdapterError>,
}

fn last_error_suffix(last_error: &Option<AdapterError>) -> String {
    match last_error {
        Some(err) => format!("; last error: {err}"),
        None => String::new(),
    }
}

/// How a polled job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    Completed(JobSnapshot),
    /// FAILED, or a status the workflow does not recognize.
    Failed(JobSnapshot),
}

/// Result of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAttempt {
    /// The job left IN_PROGRESS.
    Resolved(JobSnapshot),
    /// Still running; `None` when the check hit a transient error.
    Pending(Option<JobSnapshot>),
    Exhausted(PollTimeout),
}

/// Bounded wait/check loop around an asynchronous transcription job.
///
/// The engine drives `wait` and `check` from its own Wait and
/// GetTranscriptionStatus states; `poll_until_resolved` runs the same loop
/// standalone. Either way the attempt counter is shared, so the bound holds.
#[derive(Debug)]
pub struct PollingController {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
    last_status: Option<TranscriptionStatus>,
    last_error: Option<AdapterError>,
}

impl PollingController {
    /// A bound of zero is treated as one attempt.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
            attempts: 0,
            last_status: None,
            last_error: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Suspend until the next check. Yields to the runtime; no thread is held.
    pub async fn wait(&self) {
        tokio::time::sleep(self.interval).await;
    }

    /// Ask the adapter for the job status once.
    ///
    /// Adapter errors are transient here: they consume an attempt but never
    /// resolve the job.
    pub async fn check<A: ServiceAdapter>(&mut self, adapter: &A, job_name: &str) -> PollAttempt {
        self.attempts += 1;
        let snapshot = match adapter.poll_status(job_name).await {
            Ok(snapshot) if snapshot.status != TranscriptionStatus::InProgress => {
                tracing::debug!(attempt = self.attempts, status = %snapshot.status, "transcription job resolved");
                self.last_status = Some(snapshot.status);
                return PollAttempt::Resolved(snapshot);
            }
            Ok(snapshot) => {
                self.last_status = Some(snapshot.status);
                Some(snapshot)
            }
            Err(err) => {
                tracing::warn!(attempt = self.attempts, error = %err, "status check failed, will retry");
                self.last_error = Some(err);
                None
            }
        };

        if self.attempts >= self.max_attempts {
            return PollAttempt::Exhausted(PollTimeout {
                job_name: job_name.to_string(),
                attempts: self.attempts,
                last_status: self.last_status,
                last_error: self.last_error.clone(),
            });
        }
        tracing::debug!(attempt = self.attempts, max = self.max_attempts, "transcription job still running");
        PollAttempt::Pending(snapshot)
    }

    /// Wait then check, repeatedly, until the job resolves or the bound is hit.
    #[tracing::instrument(skip(self, adapter), fields(max_attempts = self.max_attempts))]
    pub async fn poll_until_resolved<A: ServiceAdapter>(
        &mut self,
        adapter: &A,
        job_name: &str,
    ) -> Result<TerminalStatus, PollTimeout> {
        loop {
            self.wait().await;
            match self.check(adapter, job_name).await {
                PollAttempt::Resolved(snapshot) => {
                    return Ok(if snapshot.status == TranscriptionStatus::Completed {
                        TerminalStatus::Completed(snapshot)
                    } else {
                        TerminalStatus::Failed(snapshot)
                    });
                }
                PollAttempt::Pending(_) => continue,
                PollAttempt::Exhausted(timeout) => return Err(timeout),
            }
        }
    }
}
