//! The broadcast bus and subscriptions

use courier_metrics::metrics;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::event::{DomainEvent, EventFilter};

const fn default_capacity() -> usize {
    256
}

/// Publish/subscribe channel for [`DomainEvent`]s
///
/// Cheap to clone; every clone publishes into the same channel. Construct
/// one at process start and hand it to the orchestrator, worker, webhook
/// ingestor, and consumers rather than holding a global connection handle.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(default_capacity())
    }
}

impl EventBus {
    /// Create a bus whose channel buffers up to `capacity` events per
    /// subscriber before the slowest subscriber starts lagging
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to every live subscriber
    ///
    /// Fire-and-forget: publishing never blocks and never fails the caller.
    /// If no subscriber is listening the event is dropped; the drop is
    /// counted so it is observable beyond a log line.
    pub fn publish(&self, event: DomainEvent) {
        let kind = event.kind();

        if let Some(m) = metrics() {
            m.bus.record_published(kind.as_str());
        }

        if self.sender.send(event).is_err() {
            debug!(event_type = %kind, "No live subscriber, event dropped");
            if let Some(m) = metrics() {
                m.bus.record_dropped(kind.as_str());
            }
        }
    }

    /// Open a subscription filtered to the given event kinds
    ///
    /// Every live subscription receives every published event (broadcast,
    /// not partitioned); the filter is applied on the receiving side.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One subscriber's filtered view of the bus
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<DomainEvent>,
    filter: EventFilter,
}

impl Subscription {
    /// Receive the next event matching this subscription's filter
    ///
    /// Returns `None` once the bus has been dropped and the backlog drained.
    /// A lagging subscriber skips the events it missed (at-most-once) and
    /// keeps receiving.
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(event.kind()) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Subscriber lagged, events missed");
                    if let Some(m) = metrics() {
                        m.bus.record_lagged(missed);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
