use serde::{Deserialize, Serialize};

/// Lifecycle status of a send record
///
/// A record is created as `PendingSend` and moved to `Sent` or `Failed`
/// exclusively by the delivery worker. `Sent` is final; `Failed` is recorded
/// on every failing attempt, so a record may read `Failed` while a retry is
/// still pending and later flip to `Sent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    /// Queued for delivery, not yet attempted (or enqueued but orphaned)
    PendingSend,
    /// Accepted by the provider; `provider_message_id` and `sent_at` are set
    Sent,
    /// The most recent delivery attempt failed
    Failed,
}

impl SendStatus {
    /// Whether the provider has accepted the message
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

impl std::fmt::Display for SendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingSend => write!(f, "PENDING_SEND"),
            Self::Sent => write!(f, "SENT"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}
