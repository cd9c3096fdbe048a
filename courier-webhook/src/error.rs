//! Webhook server error types

use thiserror::Error;

/// Errors that can occur while running the webhook server
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Failed to bind to the specified address
    #[error("Failed to bind webhook server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    /// Webhook server encountered a runtime error
    #[error("Webhook server error: {0}")]
    ServerError(String),
}
