//! Queue job types

use std::time::SystemTime;

use courier_common::EmailId;
use serde::{Deserialize, Serialize};

/// Where a job currently sits in its claim/retry cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Claimable immediately
    Ready,
    /// Claimed by a worker; becomes claimable again once the lease expires
    Leased {
        #[serde(skip)]
        lease_expires_at: Option<SystemTime>,
    },
    /// Waiting out a backoff delay before the next attempt
    Scheduled {
        #[serde(skip)]
        next_attempt_at: Option<SystemTime>,
        last_error: String,
    },
}

/// A work item in the delivery queue
///
/// Owned entirely by the queue: created on enqueue, consumed and discarded
/// on terminal success or attempt exhaustion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueJob {
    /// The send record this job delivers
    pub email_id: EmailId,
    /// Current claim/retry state
    pub status: JobStatus,
    /// Number of attempts started so far (incremented on claim)
    pub attempts: u32,
    /// When the job was first enqueued
    #[serde(skip, default = "SystemTime::now")]
    pub enqueued_at: SystemTime,
}

impl QueueJob {
    #[must_use]
    pub fn new(email_id: EmailId) -> Self {
        Self {
            email_id,
            status: JobStatus::Ready,
            attempts: 0,
            enqueued_at: SystemTime::now(),
        }
    }
}

/// A claimed job handed to exactly one worker for the duration of its lease
#[derive(Debug, Clone)]
pub struct LeasedJob {
    pub email_id: EmailId,
    /// 1-based attempt number this claim represents
    pub attempt: u32,
}
