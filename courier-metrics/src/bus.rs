//! Event bus metrics
//!
//! Publishing is fire-and-forget, so a dropped event (no live subscriber)
//! would otherwise only be a log line; the drop counter makes it observable.

use opentelemetry::{KeyValue, metrics::Counter};

use crate::meter;

/// Event bus metrics collector
#[derive(Debug)]
pub struct BusMetrics {
    /// Total events published, by event type
    events_published: Counter<u64>,

    /// Total publishes that reached no live subscriber
    publishes_dropped: Counter<u64>,

    /// Total consumer handler errors, by consumer
    handler_errors: Counter<u64>,

    /// Total events a lagging subscriber missed
    subscriber_lagged: Counter<u64>,
}

impl BusMetrics {
    /// Create the bus metric instruments
    #[must_use]
    pub fn new() -> Self {
        let meter = meter();

        let events_published = meter
            .u64_counter("courier.bus.events.published.total")
            .with_description("Total events published to the bus by type")
            .build();

        let publishes_dropped = meter
            .u64_counter("courier.bus.publishes.dropped.total")
            .with_description("Total publishes that reached no live subscriber")
            .build();

        let handler_errors = meter
            .u64_counter("courier.bus.handler.errors.total")
            .with_description("Total consumer handler errors by consumer")
            .build();

        let subscriber_lagged = meter
            .u64_counter("courier.bus.subscriber.lagged.total")
            .with_description("Total events missed by lagging subscribers")
            .build();

        Self {
            events_published,
            publishes_dropped,
            handler_errors,
            subscriber_lagged,
        }
    }

    /// Record a published event
    pub fn record_published(&self, event_type: &'static str) {
        self.events_published
            .add(1, &[KeyValue::new("type", event_type)]);
    }

    /// Record a publish that no subscriber received
    pub fn record_dropped(&self, event_type: &'static str) {
        self.publishes_dropped
            .add(1, &[KeyValue::new("type", event_type)]);
    }

    /// Record a consumer handler error
    pub fn record_handler_error(&self, consumer: &'static str) {
        self.handler_errors
            .add(1, &[KeyValue::new("consumer", consumer)]);
    }

    /// Record events missed by a lagging subscriber
    pub fn record_lagged(&self, missed: u64) {
        self.subscriber_lagged.add(missed, &[]);
    }
}

impl Default for BusMetrics {
    fn default() -> Self {
        Self::new()
    }
}
