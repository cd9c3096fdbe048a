//! The consumer trait and its error-isolating run loop

use async_trait::async_trait;
use courier_bus::{DomainEvent, EventBus, EventFilter};
use courier_common::{Signal, internal};
use thiserror::Error;
use tracing::error;

/// Errors a consumer's side effect can produce
///
/// These never travel further than the run loop; they are logged, counted,
/// and dropped.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// The consumer's backing store failed
    #[error("Consumer store error: {0}")]
    Store(String),

    /// The handler could not apply its side effect
    #[error("Handler error: {0}")]
    Handler(String),
}

/// A subscriber applying side effects to a subset of event types
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Stable name, used in logs and metrics labels
    fn name(&self) -> &'static str;

    /// The event kinds this consumer subscribes to
    fn filter(&self) -> EventFilter;

    /// Apply this consumer's side effect for one event
    async fn handle(&self, event: DomainEvent) -> Result<(), ConsumerError>;
}

/// Run a consumer against the bus until shutdown
///
/// Handler errors are caught per-message: the loop logs them, bumps the
/// handler-error counter, and keeps receiving, so one failing handler never
/// prevents delivery to other subscribers or crashes the process.
pub async fn run(
    consumer: &dyn EventConsumer,
    bus: &EventBus,
    mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
) {
    internal!("Consumer {} starting", consumer.name());
    let mut subscription = bus.subscribe(consumer.filter());

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    // Bus dropped: nothing more will arrive
                    break;
                };

                if let Err(e) = consumer.handle(event).await {
                    error!(
                        consumer = consumer.name(),
                        error = %e,
                        "Consumer handler error, event dropped"
                    );
                    if let Some(m) = courier_metrics::metrics() {
                        m.bus.record_handler_error(consumer.name());
                    }
                }
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }

    internal!("Consumer {} stopped", consumer.name());
}
