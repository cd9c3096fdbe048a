//! Courier: email delivery and event propagation
//!
//! The top-level crate wires the subsystem together:
//! - [`orchestrator::SendOrchestrator`] accepts send requests, creates the
//!   durable send record, and enqueues a delivery job
//! - the delivery worker drains the queue and drives the provider transport
//! - lifecycle events fan out over the bus to the analytics and campaign
//!   consumers
//! - the webhook server turns external open/reply signals into bus events
//!
//! [`controller::Courier`] owns the assembled pipeline and runs it until a
//! shutdown signal arrives.

pub mod config;
pub mod controller;
pub mod orchestrator;

pub use config::CourierConfig;
pub use controller::Courier;
pub use orchestrator::{SendError, SendOrchestrator};
