//! Typed error handling for delivery operations

use thiserror::Error;

/// Errors surfaced while rebuilding or driving the delivery pipeline
///
/// Per-attempt transport and store failures never reach the caller; the
/// worker absorbs those into the retry cycle. This covers the operations
/// with a caller to fail, queue restoration foremost.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The send record store failed
    #[error("Store failure: {0}")]
    Store(#[from] courier_store::StoreError),

    /// The job queue rejected a job
    #[error("Queue failure: {0}")]
    Queue(#[from] courier_queue::QueueError),
}
