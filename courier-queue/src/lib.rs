//! Delivery job queue
//!
//! An at-least-once work queue of "deliver this email" jobs:
//! - one job per email id, enqueued by the orchestrator
//! - workers claim ready jobs under a lease (visibility timeout); a crashed
//!   worker's lease expires and the job becomes claimable again
//! - failed attempts are retried with exponential backoff up to a fixed
//!   attempt ceiling, after which the job is dropped; the `FAILED` row in
//!   the send record store is the only durable trace of exhaustion

pub mod job;
pub mod queue;
pub mod retry;

pub use job::{JobStatus, LeasedJob, QueueJob};
pub use queue::{JobQueue, QueueError, RetryDecision};
pub use retry::RetryPolicy;
