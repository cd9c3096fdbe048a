//! OpenTelemetry metrics for the courier pipeline
//!
//! Metrics are pushed via OTLP/HTTP to an OpenTelemetry Collector, which can
//! expose them in Prometheus format for scraping.
//!
//! - **Delivery metrics**: attempt counts by outcome, delivery durations,
//!   queue depth
//! - **Bus metrics**: events published by type, dropped publishes (no live
//!   subscriber), consumer handler errors
//!
//! Call [`init_metrics`] once at process start. Recording sites use
//! [`metrics()`] and no-op when the system was never initialized (tests,
//! disabled config).

mod bus;
mod config;
mod delivery;
mod error;
mod exporter;

pub use bus::BusMetrics;
pub use config::MetricsConfig;
pub use delivery::DeliveryMetrics;
pub use error::MetricsError;
use once_cell::sync::OnceCell;

/// Global metrics instance
static METRICS_INSTANCE: OnceCell<Metrics> = OnceCell::new();

/// Root metrics container
#[derive(Debug)]
pub struct Metrics {
    pub delivery: DeliveryMetrics,
    pub bus: BusMetrics,
}

/// Fetch the meter used for all courier instruments
pub(crate) fn meter() -> opentelemetry::metrics::Meter {
    opentelemetry::global::meter("courier")
}

/// Initialize the metrics system
///
/// Must be called once at startup before any metrics are recorded. If
/// metrics are disabled in the config, this is a no-op and every recording
/// site stays a no-op as well.
///
/// # Errors
/// Returns an error if the exporter cannot be built or if called twice.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::info!("Metrics collection is disabled");
        return Ok(());
    }

    tracing::info!(
        endpoint = %config.endpoint,
        "Initializing OpenTelemetry metrics with OTLP exporter"
    );

    let provider = exporter::init_otlp_exporter(config.endpoint.clone())?;
    opentelemetry::global::set_meter_provider(provider);

    let metrics = Metrics {
        delivery: DeliveryMetrics::new(),
        bus: BusMetrics::new(),
    };

    METRICS_INSTANCE
        .set(metrics)
        .map_err(|_| MetricsError::AlreadyInitialized)
}

/// The global metrics instance, if initialized
#[must_use]
pub fn metrics() -> Option<&'static Metrics> {
    METRICS_INSTANCE.get()
}
