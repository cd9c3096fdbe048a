//! Delivery worker orchestration
//!
//! The worker runs continuously: on every tick it claims ready jobs from the
//! queue and processes them on a bounded pool of concurrent tasks. Handling
//! of a single job is sequential internally; several jobs may be in flight
//! across the pool.

mod attempt;

use std::{sync::Arc, time::Duration};

use courier_bus::EventBus;
use courier_common::{Signal, internal};
use courier_queue::JobQueue;
use courier_store::SendStore;
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::{error::DeliveryError, transport::Transport};

const fn default_process_interval_ms() -> u64 {
    1_000
}

fn default_max_concurrent() -> usize {
    num_cpus::get()
}

/// Worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// How often to look for claimable jobs (in milliseconds)
    #[serde(default = "default_process_interval_ms")]
    pub process_interval_ms: u64,

    /// Upper bound on jobs in flight at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            process_interval_ms: default_process_interval_ms(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Pulls delivery jobs, drives the transport, updates the send record store,
/// and publishes lifecycle events
///
/// All collaborators are injected at construction; the worker holds no
/// global state and any number of workers may share one queue.
#[derive(Debug)]
pub struct DeliveryWorker {
    config: WorkerConfig,
    store: Arc<dyn SendStore>,
    queue: JobQueue,
    transport: Arc<dyn Transport>,
    bus: EventBus,
}

impl DeliveryWorker {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn SendStore>,
        queue: JobQueue,
        transport: Arc<dyn Transport>,
        bus: EventBus,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            transport,
            bus,
        }
    }

    /// Rebuild the job queue from the send record store.
    ///
    /// The queue is in-process state; the store rows are the durable source
    /// of truth. Calling this once at startup re-enqueues every row the
    /// previous process left deliverable (queued, mid-retry, or failed with
    /// attempts remaining), so a crash never orphans a send. Attempt counts
    /// are not persisted, so restored jobs start with a fresh attempt
    /// budget. `SENT` rows are never re-enqueued.
    ///
    /// # Errors
    /// Returns an error if the store cannot be listed or the queue rejects a
    /// restored job.
    pub async fn restore(&self) -> Result<usize, DeliveryError> {
        let ids = self.store.list().await?;
        let mut restored = 0usize;

        for id in ids {
            if self.queue.contains(&id) {
                continue;
            }

            let email = match self.store.find(&id).await {
                Ok(Some(email)) => email,
                Ok(None) => continue,
                Err(e) => {
                    warn!(email_id = %id, error = %e, "Skipping unreadable record during queue restore");
                    continue;
                }
            };

            if !email.is_deliverable() {
                continue;
            }

            self.queue.enqueue(id)?;
            restored += 1;
        }

        if restored > 0 {
            internal!("Restored {restored} delivery jobs from the send record store");
        }

        Ok(restored)
    }

    /// Run the worker until a shutdown signal arrives
    ///
    /// ## Graceful drain
    ///
    /// On shutdown the worker stops claiming new jobs and lets the batch in
    /// flight finish before returning. Abrupt termination is survivable
    /// regardless: an unfinished job's lease expires and another worker (or
    /// a restart) picks it up.
    pub async fn serve(&self, mut shutdown: tokio::sync::broadcast::Receiver<Signal>) {
        internal!("Delivery worker starting");

        let mut process_timer =
            tokio::time::interval(Duration::from_millis(self.config.process_interval_ms));
        // Skip the immediate first tick
        process_timer.tick().await;

        loop {
            tokio::select! {
                _ = process_timer.tick() => {
                    self.process_batch().await;
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown) => {
                            internal!("Delivery worker received shutdown signal");
                            break;
                        }
                        Err(e) => {
                            error!("Delivery worker shutdown channel error: {e}");
                            break;
                        }
                    }
                }
            }
        }

        internal!("Delivery worker shutdown complete");
    }

    /// Claim and process one batch of ready jobs in parallel
    ///
    /// Since the batch is awaited to completion here, a shutdown signal
    /// observed by `serve` never interrupts an in-flight delivery.
    pub async fn process_batch(&self) {
        let claimed = self
            .queue
            .claim_ready(std::time::SystemTime::now(), self.config.max_concurrent);

        if let Some(m) = courier_metrics::metrics() {
            m.delivery
                .update_queue_depth(u64::try_from(self.queue.len()).unwrap_or(u64::MAX));
        }

        if claimed.is_empty() {
            return;
        }

        debug!(
            claimed = claimed.len(),
            max_concurrent = self.config.max_concurrent,
            "Processing delivery jobs"
        );

        let mut join_set: JoinSet<()> = JoinSet::new();
        for job in claimed {
            let store = Arc::clone(&self.store);
            let transport = Arc::clone(&self.transport);
            let queue = self.queue.clone();
            let bus = self.bus.clone();

            join_set.spawn(async move {
                attempt::process_attempt(&*store, &*transport, &queue, &bus, &job).await;
            });
        }

        while join_set.join_next().await.is_some() {}
    }
}
