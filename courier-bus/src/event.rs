//! Domain event types and wire format

use chrono::{DateTime, Utc};
use courier_common::EmailId;
use serde::{Deserialize, Serialize};

/// An email lifecycle event
///
/// A closed sum type over the four event kinds, so adding a kind is a
/// compile-time-visible change everywhere it must be handled. Events are
/// transient: the bus never persists them, and durability of their effects
/// is the consumer's job.
///
/// Wire form is `{"type": "...", "payload": {...}}` JSON, with the four
/// `SCREAMING_SNAKE_CASE` type constants. The in-process broadcast channel
/// moves typed values and never serializes; any transport that carries
/// events across a process boundary (HTTP push, log shipping) must encode
/// with [`Self::to_wire`] and decode with [`Self::from_wire`] to get the
/// unknown-type tolerance consumers rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    EmailQueued {
        email_id: EmailId,
    },
    EmailSent {
        email_id: EmailId,
        provider_message_id: String,
        sent_at: DateTime<Utc>,
    },
    EmailOpened {
        email_id: EmailId,
        opened_at: DateTime<Utc>,
    },
    EmailReplied {
        email_id: EmailId,
        reply_subject: Option<String>,
        reply_body: Option<String>,
        replied_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// The kind tag of this event
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::EmailQueued { .. } => EventKind::EmailQueued,
            Self::EmailSent { .. } => EventKind::EmailSent,
            Self::EmailOpened { .. } => EventKind::EmailOpened,
            Self::EmailReplied { .. } => EventKind::EmailReplied,
        }
    }

    /// The send record this event concerns
    #[must_use]
    pub const fn email_id(&self) -> EmailId {
        match self {
            Self::EmailQueued { email_id }
            | Self::EmailSent { email_id, .. }
            | Self::EmailOpened { email_id, .. }
            | Self::EmailReplied { email_id, .. } => *email_id,
        }
    }

    /// Serialize to the `{type, payload}` wire form
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode an event from its wire form
    ///
    /// Returns `Ok(None)` for a well-formed envelope carrying an unknown
    /// future event type, so consumers skip it instead of erroring.
    pub fn from_wire(raw: &str) -> Result<Option<Self>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        let known = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|tag| EventKind::ALL.iter().any(|kind| kind.as_str() == tag));
        if !known {
            return Ok(None);
        }

        serde_json::from_value(value).map(Some)
    }
}

/// The four event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EmailQueued,
    EmailSent,
    EmailOpened,
    EmailReplied,
}

impl EventKind {
    pub const ALL: [Self; 4] = [
        Self::EmailQueued,
        Self::EmailSent,
        Self::EmailOpened,
        Self::EmailReplied,
    ];

    /// The wire-format type constant
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmailQueued => "EMAIL_QUEUED",
            Self::EmailSent => "EMAIL_SENT",
            Self::EmailOpened => "EMAIL_OPENED",
            Self::EmailReplied => "EMAIL_REPLIED",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::EmailQueued => 0,
            Self::EmailSent => 1,
            Self::EmailOpened => 2,
            Self::EmailReplied => 3,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscriber-side event type filter
///
/// The channel itself is type-oblivious; each subscription filters to the
/// kinds it cares about.
#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    kinds: [bool; 4],
}

impl EventFilter {
    /// Match every event kind
    #[must_use]
    pub const fn all() -> Self {
        Self { kinds: [true; 4] }
    }

    /// Match only the given kinds
    #[must_use]
    pub fn only(kinds: &[EventKind]) -> Self {
        let mut filter = Self {
            kinds: [false; 4],
        };
        for kind in kinds {
            filter.kinds[kind.index()] = true;
        }
        filter
    }

    /// Whether this filter accepts the given kind
    #[must_use]
    pub const fn matches(&self, kind: EventKind) -> bool {
        self.kinds[kind.index()]
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}
