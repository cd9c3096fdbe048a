//! The outbound transport seam
//!
//! The mail provider itself (SMTP, HTTP API) is an external collaborator;
//! the worker only sees this trait. Timeouts are enforced inside the
//! transport implementation, not by the worker.

use async_trait::async_trait;
use courier_store::Email;
use thiserror::Error;
use tracing::info;

/// The message handed to the transport
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl From<&Email> for OutboundMessage {
    fn from(email: &Email) -> Self {
        Self {
            from: email.from_email.clone(),
            to: email.to_email.clone(),
            subject: email.subject.clone(),
            html: email.body_html.clone(),
            text: email.body_text.clone(),
        }
    }
}

/// Transport failures
///
/// The transient/permanent distinction is carried in the type, but the
/// worker currently retries both uniformly; distinguishing them in the retry
/// policy is a possible refinement.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failure likely to succeed on retry (connection refused, 4xx, timeout)
    #[error("Transient transport failure: {0}")]
    Transient(String),

    /// Failure that will not succeed on retry (rejected recipient, 5xx)
    #[error("Permanent transport failure: {0}")]
    Permanent(String),
}

/// An outbound mail transport
///
/// `deliver` returns the provider-assigned message id on success. Delivery
/// to the provider is at-least-once from the pipeline's perspective: a
/// redelivered job calls `deliver` again and may send a duplicate physical
/// email, an accepted tradeoff in place of provider-side dedup.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Hand the message to the provider, returning its message id
    async fn deliver(&self, message: &OutboundMessage) -> Result<String, TransportError>;
}

/// Transport for local development: logs the message and fabricates a
/// provider message id
#[derive(Debug, Clone, Default)]
pub struct DevTransport;

#[async_trait]
impl Transport for DevTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<String, TransportError> {
        let provider_message_id = format!("dev-{}", ulid::Ulid::new());
        info!(
            to = %message.to,
            subject = %message.subject,
            provider_message_id = %provider_message_id,
            "Dev transport accepted message"
        );
        Ok(provider_message_id)
    }
}
