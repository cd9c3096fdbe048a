//! In-process pipeline harness.
//!
//! Runs the whole send pipeline inside the test process: orchestrator,
//! job queue, delivery worker, event bus, and the analytics consumer. Retry
//! delays and the worker tick interval are shrunk to milliseconds so a
//! three-attempt exhaustion completes in well under a second.

use std::{sync::Arc, time::Duration};

use courier::SendOrchestrator;
use courier_bus::EventBus;
use courier_common::{EmailId, Signal};
use courier_consumers::{AnalyticsConsumer, MemoryEngagementStore, consumer};
use courier_delivery::{DeliveryWorker, WorkerConfig};
use courier_queue::{JobQueue, RetryPolicy};
use courier_store::{MemoryStore, SendPayload, SendStore};
use tokio::{sync::broadcast, task::JoinHandle, time::timeout};

use super::transport::FakeTransport;

/// A running pipeline with handles to every seam a test might inspect.
pub struct PipelineHarness {
    pub store: Arc<dyn SendStore>,
    pub queue: JobQueue,
    pub bus: EventBus,
    pub transport: Arc<FakeTransport>,
    pub orchestrator: SendOrchestrator,
    pub analytics: Arc<AnalyticsConsumer>,
    pub engagement: Arc<MemoryEngagementStore>,

    shutdown_tx: broadcast::Sender<Signal>,
    worker_handle: JoinHandle<()>,
    analytics_handle: JoinHandle<()>,
}

impl PipelineHarness {
    /// Retry policy used by the harness: 3 attempts, ~10ms backoff, no
    /// jitter, so attempt timing is predictable.
    pub fn fast_retry_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 50,
            jitter_factor: 0.0,
        }
    }

    /// Start the pipeline around the given transport.
    pub async fn start(transport: FakeTransport) -> Self {
        let store: Arc<dyn SendStore> = Arc::new(MemoryStore::new());
        let queue = JobQueue::new(Self::fast_retry_policy()).with_lease(Duration::from_secs(5));
        let bus = EventBus::new(64);
        let transport = Arc::new(transport);

        let orchestrator = SendOrchestrator::new(Arc::clone(&store), queue.clone(), bus.clone());

        let engagement = Arc::new(MemoryEngagementStore::new());
        let analytics = Arc::new(AnalyticsConsumer::new(
            Arc::clone(&engagement) as Arc<dyn courier_consumers::EngagementStore>
        ));

        let (shutdown_tx, _) = broadcast::channel(8);

        let worker = DeliveryWorker::new(
            WorkerConfig {
                process_interval_ms: 10,
                max_concurrent: 4,
            },
            Arc::clone(&store),
            queue.clone(),
            Arc::clone(&transport) as Arc<dyn courier_delivery::Transport>,
            bus.clone(),
        );
        let worker_handle = {
            let shutdown = shutdown_tx.subscribe();
            tokio::spawn(async move { worker.serve(shutdown).await })
        };

        let analytics_handle = {
            let analytics = Arc::clone(&analytics);
            let bus = bus.clone();
            let shutdown = shutdown_tx.subscribe();
            tokio::spawn(async move { consumer::run(analytics.as_ref(), &bus, shutdown).await })
        };

        Self {
            store,
            queue,
            bus,
            transport,
            orchestrator,
            analytics,
            engagement,
            shutdown_tx,
            worker_handle,
            analytics_handle,
        }
    }

    /// A representative send payload.
    pub fn payload() -> SendPayload {
        SendPayload {
            user_id: "u1".into(),
            prospect_id: "p1".into(),
            draft_id: "d1".into(),
            campaign_id: Some("c1".into()),
            from_email: "rep@corp.example".into(),
            to_email: "lead@acme.example".into(),
            subject: "Quick question".into(),
            body_html: "<p>Hi there</p>".into(),
            body_text: "Hi there".into(),
        }
    }

    /// Poll the store until the record satisfies `predicate`.
    pub async fn wait_for_record(
        &self,
        id: EmailId,
        predicate: impl Fn(&courier_store::Email) -> bool,
    ) -> courier_store::Email {
        let poll = async {
            loop {
                if let Some(email) = self.store.find(&id).await.expect("store read failed")
                    && predicate(&email)
                {
                    return email;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };

        timeout(Duration::from_secs(5), poll)
            .await
            .expect("record never reached the expected state")
    }

    /// Poll until the transport has seen at least `n` delivery attempts.
    pub async fn wait_for_calls(&self, n: usize) {
        let poll = async {
            while self.transport.calls() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };

        timeout(Duration::from_secs(5), poll)
            .await
            .expect("transport never reached the expected attempt count");
    }

    /// Poll until the job for `id` has left the queue.
    pub async fn wait_for_queue_drain(&self, id: EmailId) {
        let poll = async {
            while self.queue.contains(&id) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };

        timeout(Duration::from_secs(5), poll)
            .await
            .expect("job never left the queue");
    }

    /// Stop the worker and consumer tasks.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(Signal::Shutdown);
        let _ = self.worker_handle.await;
        let _ = self.analytics_handle.await;
    }
}
