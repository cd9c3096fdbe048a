//! Campaign consumer
//!
//! Pass-through stub reacting to all four event kinds: the extension point
//! for multi-step sequence advancement (e.g. scheduling the next step of a
//! campaign when a prospect replies). Must never block or error the bus on
//! kinds it has nothing to do for yet.

use async_trait::async_trait;
use courier_bus::{DomainEvent, EventFilter};
use tracing::debug;

use crate::consumer::{ConsumerError, EventConsumer};

#[derive(Debug, Clone, Default)]
pub struct CampaignConsumer;

impl CampaignConsumer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventConsumer for CampaignConsumer {
    fn name(&self) -> &'static str {
        "campaign"
    }

    fn filter(&self) -> EventFilter {
        EventFilter::all()
    }

    async fn handle(&self, event: DomainEvent) -> Result<(), ConsumerError> {
        // Exhaustive on purpose: a new event kind must be considered here
        match event {
            DomainEvent::EmailQueued { email_id } => {
                debug!(email_id = %email_id, "Campaign consumer observed queue");
            }
            DomainEvent::EmailSent { email_id, .. } => {
                debug!(email_id = %email_id, "Campaign consumer observed send");
            }
            DomainEvent::EmailOpened { email_id, .. } => {
                debug!(email_id = %email_id, "Campaign consumer observed open");
            }
            DomainEvent::EmailReplied { email_id, .. } => {
                // TODO(sequencing): schedule the next campaign step on reply
                debug!(email_id = %email_id, "Campaign consumer observed reply");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use courier_common::EmailId;

    use super::*;

    #[tokio::test]
    async fn test_handles_all_kinds_without_error() {
        let consumer = CampaignConsumer::new();
        let id = EmailId::generate();

        let events = [
            DomainEvent::EmailQueued { email_id: id },
            DomainEvent::EmailSent {
                email_id: id,
                provider_message_id: "m1".into(),
                sent_at: Utc::now(),
            },
            DomainEvent::EmailOpened {
                email_id: id,
                opened_at: Utc::now(),
            },
            DomainEvent::EmailReplied {
                email_id: id,
                reply_subject: None,
                reply_body: None,
                replied_at: Utc::now(),
            },
        ];

        for event in events {
            consumer.handle(event).await.unwrap();
        }
    }
}
