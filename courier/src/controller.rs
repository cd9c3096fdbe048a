//! Top-level controller: wires the pipeline together and runs it.

use std::sync::{Arc, LazyLock};

use courier_bus::EventBus;
use courier_common::{Signal, internal, logging};
use courier_consumers::{AnalyticsConsumer, CampaignConsumer, MemoryEngagementStore, consumer};
use courier_delivery::{DeliveryWorker, DevTransport, Transport};
use courier_webhook::{WebhookServer, WebhookState};
use tokio::sync::broadcast;

use crate::config::CourierConfig;

/// The assembled service.
///
/// [`Courier::run`] builds every component from the parsed config and serves
/// until shutdown.
#[derive(Default)]
pub struct Courier {
    config: CourierConfig,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!("Terminate signal received, shutting down");
        }
    };

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    loop {
        tokio::select! {
            sig = receiver.recv() => {
                match sig {
                    Ok(s) => tracing::debug!("Received {s:?}"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!("Received: {e:?}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    Ok(())
}

/// Serve the webhook ingestor, or idle until shutdown when it is disabled.
async fn serve_webhook(
    server: Option<WebhookServer>,
    mut shutdown: broadcast::Receiver<Signal>,
) -> anyhow::Result<()> {
    match server {
        Some(server) => Ok(server.serve(shutdown).await?),
        None => {
            let _ = shutdown.recv().await;
            Ok(())
        }
    }
}

impl Courier {
    #[must_use]
    pub fn new(config: CourierConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline, and everything in it.
    ///
    /// Sends are accepted through the library-level
    /// [`crate::SendOrchestrator`]; this controller drives everything
    /// downstream of it: the delivery worker, the bus consumers, and the
    /// webhook ingestor.
    ///
    /// # Errors
    ///
    /// Returns an error if any component fails to initialise, or if a
    /// serving component exits with an error.
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();
        courier_metrics::init_metrics(&self.config.metrics)?;

        let store = self.config.store.into_store().await?;
        let queue = self.config.queue.into_queue();
        let bus = EventBus::new(self.config.bus.capacity);

        let transport: Arc<dyn Transport> = Arc::new(DevTransport);
        let worker = DeliveryWorker::new(
            self.config.worker,
            Arc::clone(&store),
            queue,
            transport,
            bus.clone(),
        );

        // Rows the previous process left deliverable become jobs again
        worker.restore().await?;

        let analytics = AnalyticsConsumer::new(Arc::new(MemoryEngagementStore::new()));
        let campaign = CampaignConsumer::new();

        let webhook = if self.config.webhook.enabled {
            let state = WebhookState {
                store: Arc::clone(&store),
                bus: bus.clone(),
            };
            Some(WebhookServer::new(self.config.webhook, state).await?)
        } else {
            None
        };

        internal!("Controller running");

        let ret = tokio::select! {
            () = worker.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            () = consumer::run(&analytics, &bus, SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            () = consumer::run(&campaign, &bus, SHUTDOWN_BROADCAST.subscribe()) => {
                Ok(())
            }
            r = serve_webhook(webhook, SHUTDOWN_BROADCAST.subscribe()) => {
                r
            }
            r = shutdown() => {
                r
            }
        };

        internal!("Shutting down...");

        ret
    }
}
