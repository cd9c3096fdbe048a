//! Queue state and claim/ack/nack operations

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use courier_common::EmailId;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    job::{JobStatus, LeasedJob, QueueJob},
    retry::RetryPolicy,
};

const fn default_lease() -> Duration {
    Duration::from_secs(60)
}

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue is at its configured capacity
    #[error("Queue capacity exceeded: {0} jobs")]
    CapacityExceeded(usize),
}

/// Outcome of a failed attempt reported via [`JobQueue::nack`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Another attempt is scheduled after a backoff delay
    Scheduled { next_attempt_at: SystemTime },
    /// The attempt ceiling is exhausted; the job has been dropped
    Exhausted,
}

/// The delivery job queue
///
/// Jobs are keyed by email id in a lock-free map, so concurrent enqueue and
/// concurrent claim from multiple worker tasks are safe. A claimed job is
/// owned by exactly one worker while its lease is live; an expired lease
/// makes the job claimable again, which is where at-least-once (rather than
/// exactly-once) delivery comes from.
#[derive(Debug, Clone)]
pub struct JobQueue {
    jobs: Arc<DashMap<EmailId, QueueJob>>,
    policy: RetryPolicy,
    lease: Duration,
    capacity: Option<usize>,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl JobQueue {
    /// Create an empty queue with the given retry policy and a 60s lease
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            policy,
            lease: default_lease(),
            capacity: None,
        }
    }

    /// Override the lease (visibility timeout) applied to claimed jobs
    #[must_use]
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Bound the number of jobs held at once
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// The retry policy this queue applies on `nack`
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Add a delivery job for an email
    ///
    /// Enqueue is idempotent per email id: a job already queued for the same
    /// email is left untouched, which keeps client retries of the same
    /// logical send from producing duplicate work.
    pub fn enqueue(&self, email_id: EmailId) -> Result<(), QueueError> {
        if let Some(cap) = self.capacity
            && self.jobs.len() >= cap
            && !self.jobs.contains_key(&email_id)
        {
            return Err(QueueError::CapacityExceeded(cap));
        }

        self.jobs
            .entry(email_id)
            .or_insert_with(|| QueueJob::new(email_id));
        Ok(())
    }

    /// Claim up to `max` jobs that are ready at `now`, leasing each one
    ///
    /// Ready means: never attempted, past its scheduled retry time, or held
    /// under a lease that has expired (a crashed worker's job).
    pub fn claim_ready(&self, now: SystemTime, max: usize) -> Vec<LeasedJob> {
        let mut claimed = Vec::new();

        for mut entry in self.jobs.iter_mut() {
            if claimed.len() >= max {
                break;
            }

            let job = entry.value_mut();
            let eligible = match &job.status {
                JobStatus::Ready => true,
                JobStatus::Scheduled {
                    next_attempt_at, ..
                } => next_attempt_at.is_none_or(|at| now >= at),
                JobStatus::Leased { lease_expires_at } => {
                    let expired = lease_expires_at.is_none_or(|at| now >= at);
                    if expired {
                        warn!(
                            email_id = %job.email_id,
                            attempt = job.attempts,
                            "Job lease expired, redelivering"
                        );
                    }
                    expired
                }
            };

            if eligible {
                job.attempts += 1;
                job.status = JobStatus::Leased {
                    lease_expires_at: Some(now + self.lease),
                };
                claimed.push(LeasedJob {
                    email_id: job.email_id,
                    attempt: job.attempts,
                });
            }
        }

        claimed
    }

    /// Acknowledge a job as done; it is removed from the queue
    ///
    /// Used both for terminal success and for no-op discards (email row
    /// missing).
    pub fn ack(&self, email_id: &EmailId) {
        self.jobs.remove(email_id);
    }

    /// Report a failed attempt
    ///
    /// Schedules a retry with exponential backoff, or drops the job once the
    /// attempt ceiling is exhausted. The queue does not re-notify anyone of
    /// final exhaustion; the `FAILED` row is the durable trace.
    pub fn nack(&self, email_id: &EmailId, error: &str) -> RetryDecision {
        let Some(mut entry) = self.jobs.get_mut(email_id) else {
            // Already removed (e.g. lease expired and another worker finished it)
            return RetryDecision::Exhausted;
        };

        let job = entry.value_mut();
        if job.attempts >= self.policy.max_attempts {
            drop(entry);
            self.jobs.remove(email_id);
            debug!(email_id = %email_id, "Attempts exhausted, dropping job");
            return RetryDecision::Exhausted;
        }

        let next_attempt_at = self.policy.next_attempt_at(job.attempts);
        job.status = JobStatus::Scheduled {
            next_attempt_at: Some(next_attempt_at),
            last_error: error.to_string(),
        };
        RetryDecision::Scheduled { next_attempt_at }
    }

    /// Whether a job for this email is currently queued
    #[must_use]
    pub fn contains(&self, email_id: &EmailId) -> bool {
        self.jobs.contains_key(email_id)
    }

    /// Number of jobs in the queue (for control and metrics)
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Snapshot of all jobs and their state
    #[must_use]
    pub fn jobs(&self) -> Vec<QueueJob> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }
}
