//! Analytics consumer
//!
//! Owns the append-only engagement records used to compute aggregate open
//! and reply rates. Every open and reply is recorded; multiple opens per
//! email are expected and kept, reflecting that open tracking is inherently
//! approximate.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_bus::{DomainEvent, EventFilter, EventKind};
use courier_common::EmailId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consumer::{ConsumerError, EventConsumer};

/// One recorded open, keyed by email id and timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenEvent {
    pub email_id: EmailId,
    pub opened_at: DateTime<Utc>,
}

/// One recorded reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEvent {
    pub email_id: EmailId,
    pub reply_subject: Option<String>,
    pub reply_body: Option<String>,
    pub replied_at: DateTime<Utc>,
}

/// Aggregate engagement over a set of emails, recomputed from the
/// append-only records
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementSummary {
    pub emails: usize,
    /// Emails with at least one recorded open
    pub opened: usize,
    /// Emails with at least one recorded reply
    pub replied: usize,
    pub total_opens: usize,
    pub total_replies: usize,
    pub open_rate: f64,
    pub reply_rate: f64,
}

/// Append-only storage for engagement records
///
/// Owned by the analytics consumer; the send record row is never mutated by
/// engagement signals.
#[async_trait]
pub trait EngagementStore: Send + Sync + std::fmt::Debug {
    async fn append_open(&self, event: OpenEvent) -> Result<(), ConsumerError>;
    async fn append_reply(&self, event: ReplyEvent) -> Result<(), ConsumerError>;
    async fn opens_for(&self, email_id: &EmailId) -> Result<Vec<OpenEvent>, ConsumerError>;
    async fn replies_for(&self, email_id: &EmailId) -> Result<Vec<ReplyEvent>, ConsumerError>;
}

/// In-memory engagement store
#[derive(Debug, Clone, Default)]
pub struct MemoryEngagementStore {
    opens: Arc<RwLock<Vec<OpenEvent>>>,
    replies: Arc<RwLock<Vec<ReplyEvent>>>,
}

impl MemoryEngagementStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> ConsumerError {
    ConsumerError::Store(format!("Lock poisoned: {e}"))
}

#[async_trait]
impl EngagementStore for MemoryEngagementStore {
    async fn append_open(&self, event: OpenEvent) -> Result<(), ConsumerError> {
        self.opens.write().map_err(poisoned)?.push(event);
        Ok(())
    }

    async fn append_reply(&self, event: ReplyEvent) -> Result<(), ConsumerError> {
        self.replies.write().map_err(poisoned)?.push(event);
        Ok(())
    }

    async fn opens_for(&self, email_id: &EmailId) -> Result<Vec<OpenEvent>, ConsumerError> {
        Ok(self
            .opens
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|e| e.email_id == *email_id)
            .cloned()
            .collect())
    }

    async fn replies_for(&self, email_id: &EmailId) -> Result<Vec<ReplyEvent>, ConsumerError> {
        Ok(self
            .replies
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|e| e.email_id == *email_id)
            .cloned()
            .collect())
    }
}

/// Records engagement events and recomputes derived rates
///
/// Subscribes to `EMAIL_OPENED` and `EMAIL_REPLIED`; `EMAIL_QUEUED` and
/// `EMAIL_SENT` are ignored for now, reserved for future funnel metrics.
#[derive(Debug)]
pub struct AnalyticsConsumer {
    store: Arc<dyn EngagementStore>,
}

impl AnalyticsConsumer {
    pub fn new(store: Arc<dyn EngagementStore>) -> Self {
        Self { store }
    }

    /// The engagement store backing this consumer
    #[must_use]
    pub fn store(&self) -> &Arc<dyn EngagementStore> {
        &self.store
    }

    /// Recompute aggregate open/reply rates over a set of emails
    ///
    /// Rates are derived entirely from the append-only records, so a replay
    /// or recount always lands on the same numbers.
    #[allow(clippy::cast_precision_loss)]
    pub async fn engagement_summary(
        &self,
        email_ids: &[EmailId],
    ) -> Result<EngagementSummary, ConsumerError> {
        let mut opened = 0usize;
        let mut replied = 0usize;
        let mut total_opens = 0usize;
        let mut total_replies = 0usize;

        for id in email_ids {
            let opens = self.store.opens_for(id).await?.len();
            let replies = self.store.replies_for(id).await?.len();
            total_opens += opens;
            total_replies += replies;
            opened += usize::from(opens > 0);
            replied += usize::from(replies > 0);
        }

        let emails = email_ids.len();
        let rate = |n: usize| if emails == 0 { 0.0 } else { n as f64 / emails as f64 };

        Ok(EngagementSummary {
            emails,
            opened,
            replied,
            total_opens,
            total_replies,
            open_rate: rate(opened),
            reply_rate: rate(replied),
        })
    }
}

#[async_trait]
impl EventConsumer for AnalyticsConsumer {
    fn name(&self) -> &'static str {
        "analytics"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::only(&[EventKind::EmailOpened, EventKind::EmailReplied])
    }

    async fn handle(&self, event: DomainEvent) -> Result<(), ConsumerError> {
        match event {
            DomainEvent::EmailOpened {
                email_id,
                opened_at,
            } => {
                self.store
                    .append_open(OpenEvent {
                        email_id,
                        opened_at,
                    })
                    .await
            }
            DomainEvent::EmailReplied {
                email_id,
                reply_subject,
                reply_body,
                replied_at,
            } => {
                self.store
                    .append_reply(ReplyEvent {
                        email_id,
                        reply_subject,
                        reply_body,
                        replied_at,
                    })
                    .await
            }
            DomainEvent::EmailQueued { email_id } | DomainEvent::EmailSent { email_id, .. } => {
                // Reserved for future funnel metrics
                debug!(email_id = %email_id, "Analytics consumer ignoring event");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened(id: EmailId) -> DomainEvent {
        DomainEvent::EmailOpened {
            email_id: id,
            opened_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_every_open_is_recorded_no_dedup() {
        let store = Arc::new(MemoryEngagementStore::new());
        let consumer = AnalyticsConsumer::new(store.clone());
        let id = EmailId::generate();

        consumer.handle(opened(id)).await.unwrap();
        consumer.handle(opened(id)).await.unwrap();
        consumer.handle(opened(id)).await.unwrap();

        assert_eq!(store.opens_for(&id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reply_recorded_with_payload() {
        let store = Arc::new(MemoryEngagementStore::new());
        let consumer = AnalyticsConsumer::new(store.clone());
        let id = EmailId::generate();

        consumer
            .handle(DomainEvent::EmailReplied {
                email_id: id,
                reply_subject: Some("Re: Quick question".into()),
                reply_body: None,
                replied_at: Utc::now(),
            })
            .await
            .unwrap();

        let replies = store.replies_for(&id).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].reply_subject.as_deref(), Some("Re: Quick question"));
    }

    #[tokio::test]
    async fn test_queued_and_sent_are_ignored() {
        let store = Arc::new(MemoryEngagementStore::new());
        let consumer = AnalyticsConsumer::new(store.clone());
        let id = EmailId::generate();

        consumer
            .handle(DomainEvent::EmailQueued { email_id: id })
            .await
            .unwrap();

        assert!(store.opens_for(&id).await.unwrap().is_empty());
        assert!(store.replies_for(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engagement_summary_recomputation() {
        let store = Arc::new(MemoryEngagementStore::new());
        let consumer = AnalyticsConsumer::new(store);

        let a = EmailId::generate();
        let b = EmailId::generate();
        let c = EmailId::generate();

        // a: opened twice and replied; b: opened once; c: untouched
        consumer.handle(opened(a)).await.unwrap();
        consumer.handle(opened(a)).await.unwrap();
        consumer
            .handle(DomainEvent::EmailReplied {
                email_id: a,
                reply_subject: None,
                reply_body: None,
                replied_at: Utc::now(),
            })
            .await
            .unwrap();
        consumer.handle(opened(b)).await.unwrap();

        let summary = consumer.engagement_summary(&[a, b, c]).await.unwrap();
        assert_eq!(summary.emails, 3);
        assert_eq!(summary.opened, 2);
        assert_eq!(summary.replied, 1);
        assert_eq!(summary.total_opens, 3);
        assert!((summary.open_rate - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!((summary.reply_rate - 1.0 / 3.0).abs() < f64::EPSILON);
    }
}
