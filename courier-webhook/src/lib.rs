//! Webhook ingestor
//!
//! Translates externally-triggered signals (open-tracking pixel hits,
//! inbound-reply notifications) into bus events. Returns `202 Accepted`
//! immediately after publishing; it never waits for consumers. Webhook
//! events bypass the job queue entirely.

mod config;
mod error;
mod server;

pub use config::WebhookConfig;
pub use error::WebhookError;
pub use server::{WebhookServer, WebhookState, router};
