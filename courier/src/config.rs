//! Top-level service configuration, deserialized from TOML.

use std::{path::PathBuf, sync::Arc, time::Duration};

use courier_delivery::WorkerConfig;
use courier_metrics::MetricsConfig;
use courier_queue::{JobQueue, RetryPolicy};
use courier_store::{FileStore, MemoryStore, SendStore};
use courier_webhook::WebhookConfig;
use serde::Deserialize;

/// Configuration for the whole service.
///
/// Every field has a sensible default, so an empty file (or no file at all
/// for the library user) yields a working in-memory instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourierConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Send record store backend selection.
///
/// ```toml
/// [store]
/// type = "File"
/// path = "/var/lib/courier/sends"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StoreConfig {
    /// File-backed store (production)
    File { path: PathBuf },
    /// Memory-backed store (testing/development)
    Memory {
        #[serde(default)]
        capacity: Option<usize>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory { capacity: None }
    }
}

impl StoreConfig {
    /// Build and initialize the configured backend as a trait object.
    ///
    /// # Errors
    /// Returns an error if a file backend's path fails validation or its
    /// directory cannot be prepared.
    pub async fn into_store(self) -> courier_store::Result<Arc<dyn SendStore>> {
        match self {
            Self::File { path } => {
                let store = FileStore::new(path)?;
                store.init().await?;
                Ok(Arc::new(store))
            }
            Self::Memory { capacity } => Ok(capacity.map_or_else(
                || Arc::new(MemoryStore::new()) as Arc<dyn SendStore>,
                |capacity| Arc::new(MemoryStore::with_capacity(capacity)),
            )),
        }
    }
}

const fn default_lease_secs() -> u64 {
    60
}

/// Delivery job queue settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Retry policy applied when a delivery attempt fails
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Lease (visibility timeout) on claimed jobs, in seconds
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Upper bound on queued jobs (omit for unbounded)
    #[serde(default)]
    pub capacity: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            lease_secs: default_lease_secs(),
            capacity: None,
        }
    }
}

impl QueueConfig {
    /// Build the configured queue.
    #[must_use]
    pub fn into_queue(self) -> JobQueue {
        let queue =
            JobQueue::new(self.retry).with_lease(Duration::from_secs(self.lease_secs));
        match self.capacity {
            Some(capacity) => queue.with_capacity(capacity),
            None => queue,
        }
    }
}

const fn default_bus_capacity() -> usize {
    256
}

/// Event bus settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Broadcast channel depth per subscriber before lag kicks in
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_working_defaults() {
        let config: CourierConfig = toml::from_str("").unwrap();

        assert!(matches!(config.store, StoreConfig::Memory { capacity: None }));
        assert_eq!(config.queue.retry.max_attempts, 3);
        assert_eq!(config.queue.lease_secs, 60);
        assert!(config.webhook.enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_full_config_roundtrip() {
        let config: CourierConfig = toml::from_str(
            r#"
            [store]
            type = "File"
            path = "/var/lib/courier/sends"

            [queue]
            lease_secs = 30
            capacity = 10000

            [queue.retry]
            max_attempts = 5
            base_delay_ms = 500

            [worker]
            process_interval_ms = 250
            max_concurrent = 8

            [webhook]
            listen_address = "127.0.0.1:9099"

            [metrics]
            enabled = true
            "#,
        )
        .unwrap();

        assert!(matches!(config.store, StoreConfig::File { .. }));
        assert_eq!(config.queue.retry.max_attempts, 5);
        assert_eq!(config.queue.retry.base_delay_ms, 500);
        assert_eq!(config.queue.capacity, Some(10_000));
        assert_eq!(config.worker.process_interval_ms, 250);
        assert_eq!(config.worker.max_concurrent, 8);
        assert_eq!(config.webhook.listen_address, "127.0.0.1:9099");
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_memory_store_with_capacity() {
        let config: CourierConfig = toml::from_str(
            r#"
            [store]
            type = "Memory"
            capacity = 100
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.store,
            StoreConfig::Memory {
                capacity: Some(100)
            }
        ));
    }
}
