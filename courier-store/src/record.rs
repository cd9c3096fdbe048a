//! The send record entity.

use chrono::{DateTime, Utc};
use courier_common::{EmailId, SendStatus};
use serde::{Deserialize, Serialize};

/// Payload fields and foreign references for a new send.
///
/// Draft ownership and address validity are checked by the calling layer
/// before this reaches the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendPayload {
    pub user_id: String,
    pub prospect_id: String,
    pub draft_id: String,
    pub campaign_id: Option<String>,
    pub from_email: String,
    pub to_email: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
}

/// A send record.
///
/// Identity fields (`id`, `idempotency_key`) and payload fields are immutable
/// after creation; only the lifecycle fields (`status`,
/// `provider_message_id`, `sent_at`) are updated, and only by the delivery
/// worker. Opens and replies are recorded as separate engagement records and
/// never touch this row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub id: EmailId,
    pub idempotency_key: String,

    pub user_id: String,
    pub prospect_id: String,
    pub draft_id: String,
    pub campaign_id: Option<String>,

    pub from_email: String,
    pub to_email: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,

    pub status: SendStatus,
    pub provider_message_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Email {
    /// Create a new record in `PENDING_SEND` with a freshly generated id.
    #[must_use]
    pub fn pending(idempotency_key: impl Into<String>, payload: SendPayload) -> Self {
        Self {
            id: EmailId::generate(),
            idempotency_key: idempotency_key.into(),
            user_id: payload.user_id,
            prospect_id: payload.prospect_id,
            draft_id: payload.draft_id,
            campaign_id: payload.campaign_id,
            from_email: payload.from_email,
            to_email: payload.to_email,
            subject: payload.subject,
            body_html: payload.body_html,
            body_text: payload.body_text,
            status: SendStatus::PendingSend,
            provider_message_id: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the record is in a state the worker may still act on.
    #[must_use]
    pub const fn is_deliverable(&self) -> bool {
        !matches!(self.status, SendStatus::Sent)
    }
}
