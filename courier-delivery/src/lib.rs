//! Delivery worker for outbound sends
//!
//! This crate provides:
//! - the [`Transport`] seam behind which the external mail provider lives
//! - the [`DeliveryWorker`] that claims queued jobs, drives the transport,
//!   updates the send record store, and publishes lifecycle events

mod error;
mod transport;
pub mod worker;

pub use error::DeliveryError;
pub use transport::{DevTransport, OutboundMessage, Transport, TransportError};
pub use worker::{DeliveryWorker, WorkerConfig};
