//! Delivery worker metrics
//!
//! Tracks outbound delivery attempts by outcome, delivery durations, and the
//! current depth of the job queue.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram},
};

use crate::meter;

/// Delivery metrics collector
#[derive(Debug)]
pub struct DeliveryMetrics {
    /// Total number of delivery attempts by outcome
    attempts_total: Counter<u64>,

    /// Total number of messages accepted by the provider
    messages_sent: Counter<u64>,

    /// Total number of messages that exhausted their attempts
    messages_failed: Counter<u64>,

    /// Total number of attempts scheduled for retry
    messages_retrying: Counter<u64>,

    /// Distribution of delivery durations
    duration_seconds: Histogram<f64>,

    // Shared with the observable gauge callback
    queue_depth: Arc<AtomicU64>,
}

impl DeliveryMetrics {
    /// Create the delivery metric instruments
    #[must_use]
    pub fn new() -> Self {
        let meter = meter();

        let attempts_total = meter
            .u64_counter("courier.delivery.attempts.total")
            .with_description("Total number of delivery attempts by outcome")
            .build();

        let messages_sent = meter
            .u64_counter("courier.delivery.messages.sent.total")
            .with_description("Total number of messages accepted by the provider")
            .build();

        let messages_failed = meter
            .u64_counter("courier.delivery.messages.failed.total")
            .with_description("Total number of messages that exhausted their delivery attempts")
            .build();

        let messages_retrying = meter
            .u64_counter("courier.delivery.messages.retrying.total")
            .with_description("Total number of delivery attempts scheduled for retry")
            .build();

        let duration_seconds = meter
            .f64_histogram("courier.delivery.duration.seconds")
            .with_description("Distribution of delivery durations")
            .build();

        let queue_depth_ref = Arc::new(AtomicU64::new(0));
        let depth = queue_depth_ref.clone();

        // The meter keeps the gauge alive internally via the callback
        meter
            .u64_observable_gauge("courier.delivery.queue.depth")
            .with_description("Current number of jobs in the delivery queue")
            .with_callback(move |observer| {
                observer.observe(depth.load(Ordering::Relaxed), &[]);
            })
            .build();

        Self {
            attempts_total,
            messages_sent,
            messages_failed,
            messages_retrying,
            duration_seconds,
            queue_depth: queue_depth_ref,
        }
    }

    /// Record one delivery attempt and its outcome
    pub fn record_attempt(&self, outcome: &'static str) {
        self.attempts_total
            .add(1, &[KeyValue::new("outcome", outcome)]);
    }

    /// Record a provider-accepted message
    pub fn record_sent(&self, duration_secs: f64) {
        self.messages_sent.add(1, &[]);
        self.duration_seconds.record(duration_secs, &[]);
    }

    /// Record an attempt-exhausted message
    pub fn record_failed(&self) {
        self.messages_failed.add(1, &[]);
    }

    /// Record an attempt scheduled for retry
    pub fn record_retrying(&self) {
        self.messages_retrying.add(1, &[]);
    }

    /// Update the queue depth gauge
    pub fn update_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }
}

impl Default for DeliveryMetrics {
    fn default() -> Self {
        Self::new()
    }
}
