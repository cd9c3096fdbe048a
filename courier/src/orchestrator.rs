//! Send orchestration: durable record first, delivery job second.

use std::sync::Arc;

use courier_bus::{DomainEvent, EventBus};
use courier_common::internal;
use courier_queue::{JobQueue, QueueError};
use courier_store::{Email, SendPayload, SendStore, StoreError};
use tracing::warn;

/// Errors surfaced to a send request.
#[derive(thiserror::Error, Debug)]
pub enum SendError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Accepts send requests and turns each into a durable `PENDING_SEND` record
/// plus a delivery job.
///
/// Ordering is fixed: the record is persisted before the job is enqueued, so
/// a job never references a row that does not exist. If enqueueing fails the
/// row remains in `PENDING_SEND` and a client retry with the same
/// idempotency key resumes from it rather than creating a duplicate.
#[derive(Debug, Clone)]
pub struct SendOrchestrator {
    store: Arc<dyn SendStore>,
    queue: JobQueue,
    bus: EventBus,
}

impl SendOrchestrator {
    pub fn new(store: Arc<dyn SendStore>, queue: JobQueue, bus: EventBus) -> Self {
        Self { store, queue, bus }
    }

    /// Create a send record and queue it for delivery.
    ///
    /// Idempotent on `idempotency_key`: a repeat request returns the
    /// existing record as-is. No second record is created, no second job is
    /// enqueued, and no second `EMAIL_QUEUED` event is published.
    ///
    /// # Errors
    /// Returns an error if the record cannot be persisted or the job cannot
    /// be enqueued.
    pub async fn create_and_queue_send(
        &self,
        idempotency_key: &str,
        payload: SendPayload,
    ) -> Result<Email, SendError> {
        if let Some(existing) = self.store.find_by_idempotency_key(idempotency_key).await? {
            internal!(
                "Send request replayed, returning existing record {} ({})",
                existing.id,
                existing.status
            );
            return Ok(existing);
        }

        let email = Email::pending(idempotency_key, payload);
        match self.store.insert(&email).await {
            Ok(()) => {}
            Err(StoreError::DuplicateKey(key)) => {
                // Lost a race with a concurrent identical request. The
                // winner's record is authoritative.
                warn!(idempotency_key = %key, "Concurrent duplicate send request");
                return self
                    .store
                    .find_by_idempotency_key(&key)
                    .await?
                    .ok_or(StoreError::DuplicateKey(key))
                    .map_err(SendError::Store);
            }
            Err(e) => return Err(e.into()),
        }

        self.queue.enqueue(email.id)?;

        internal!("Email {} queued for delivery to {}", email.id, email.to_email);
        self.bus.publish(DomainEvent::EmailQueued { email_id: email.id });

        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use courier_bus::{EventFilter, EventKind};
    use courier_common::SendStatus;
    use courier_queue::RetryPolicy;
    use courier_store::MemoryStore;

    use super::*;

    fn payload() -> SendPayload {
        SendPayload {
            user_id: "u1".into(),
            prospect_id: "p1".into(),
            draft_id: "d1".into(),
            campaign_id: Some("c1".into()),
            from_email: "rep@corp.example".into(),
            to_email: "lead@acme.example".into(),
            subject: "Quick question".into(),
            body_html: "<p>Hi</p>".into(),
            body_text: "Hi".into(),
        }
    }

    fn orchestrator() -> SendOrchestrator {
        SendOrchestrator::new(
            Arc::new(MemoryStore::new()),
            JobQueue::new(RetryPolicy::default()),
            EventBus::new(16),
        )
    }

    #[tokio::test]
    async fn test_create_persists_then_enqueues() {
        let orch = orchestrator();
        let mut subscription = orch
            .bus
            .subscribe(EventFilter::only(&[EventKind::EmailQueued]));

        let email = orch.create_and_queue_send("k1", payload()).await.unwrap();

        assert_eq!(email.status, SendStatus::PendingSend);
        assert!(orch.queue.contains(&email.id));
        assert!(orch.store.find(&email.id).await.unwrap().is_some());

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.email_id(), email.id);
    }

    #[tokio::test]
    async fn test_repeat_key_returns_existing_record() {
        let orch = orchestrator();

        let first = orch.create_and_queue_send("k1", payload()).await.unwrap();
        let second = orch.create_and_queue_send("k1", payload()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(orch.queue.len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_key_does_not_republish() {
        let orch = orchestrator();
        let mut subscription = orch.bus.subscribe(EventFilter::all());

        let email = orch.create_and_queue_send("k1", payload()).await.unwrap();
        orch.create_and_queue_send("k1", payload()).await.unwrap();

        // Drain: exactly one EMAIL_QUEUED, then the sentinel
        orch.bus.publish(DomainEvent::EmailOpened {
            email_id: email.id,
            opened_at: chrono::Utc::now(),
        });

        let first = subscription.recv().await.unwrap();
        assert_eq!(first.kind(), EventKind::EmailQueued);
        let next = subscription.recv().await.unwrap();
        assert_eq!(next.kind(), EventKind::EmailOpened);
    }

    #[tokio::test]
    async fn test_distinct_keys_are_distinct_sends() {
        let orch = orchestrator();

        let a = orch.create_and_queue_send("k1", payload()).await.unwrap();
        let b = orch.create_and_queue_send("k2", payload()).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(orch.queue.len(), 2);
    }

    /// Store whose first key lookup misses, reproducing the window where a
    /// concurrent identical request inserts its row between this request's
    /// lookup and insert.
    #[derive(Debug)]
    struct RacingStore {
        inner: MemoryStore,
        missed: std::sync::atomic::AtomicBool,
    }

    impl RacingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                missed: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl SendStore for RacingStore {
        async fn insert(&self, email: &Email) -> courier_store::Result<()> {
            self.inner.insert(email).await
        }

        async fn find(
            &self,
            id: &courier_common::EmailId,
        ) -> courier_store::Result<Option<Email>> {
            self.inner.find(id).await
        }

        async fn find_by_idempotency_key(
            &self,
            key: &str,
        ) -> courier_store::Result<Option<Email>> {
            if !self.missed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_idempotency_key(key).await
        }

        async fn mark_sent(
            &self,
            id: &courier_common::EmailId,
            provider_message_id: &str,
            sent_at: chrono::DateTime<chrono::Utc>,
        ) -> courier_store::Result<Email> {
            self.inner.mark_sent(id, provider_message_id, sent_at).await
        }

        async fn mark_failed(
            &self,
            id: &courier_common::EmailId,
        ) -> courier_store::Result<Email> {
            self.inner.mark_failed(id).await
        }

        async fn list(&self) -> courier_store::Result<Vec<courier_common::EmailId>> {
            self.inner.list().await
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_falls_back_to_winning_row() {
        let store = Arc::new(RacingStore::new());

        // The winner's row lands before this request's insert runs
        let winner = Email::pending("k1", payload());
        store.inner.insert(&winner).await.unwrap();

        let orch = SendOrchestrator::new(
            Arc::clone(&store) as Arc<dyn SendStore>,
            JobQueue::new(RetryPolicy::default()),
            EventBus::new(16),
        );

        // Lookup misses, insert hits DuplicateKey, fallback read returns
        // the winner's row
        let email = orch.create_and_queue_send("k1", payload()).await.unwrap();
        assert_eq!(email.id, winner.id);

        // The losing request enqueues no job of its own
        assert!(orch.queue.is_empty());
    }

    #[tokio::test]
    async fn test_queue_full_leaves_durable_row() {
        let store: Arc<dyn SendStore> = Arc::new(MemoryStore::new());
        let orch = SendOrchestrator::new(
            Arc::clone(&store),
            JobQueue::new(RetryPolicy::default()).with_capacity(1),
            EventBus::new(16),
        );

        orch.create_and_queue_send("k1", payload()).await.unwrap();
        let err = orch
            .create_and_queue_send("k2", payload())
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::Queue(_)));

        // The record survived the enqueue failure
        let row = store.find_by_idempotency_key("k2").await.unwrap().unwrap();
        assert_eq!(row.status, SendStatus::PendingSend);
    }
}
