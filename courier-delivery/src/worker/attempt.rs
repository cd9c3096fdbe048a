//! Single delivery attempt logic

use chrono::Utc;
use courier_bus::{DomainEvent, EventBus};
use courier_queue::{JobQueue, LeasedJob, RetryDecision};
use courier_store::SendStore;
use tracing::{debug, error, info, warn};

use crate::transport::{OutboundMessage, Transport};

/// Process one claimed job end to end
///
/// Update ordering is fixed: the send record store is written before the
/// corresponding lifecycle event is published, never the reverse, so a
/// consumer may assume the row reflects at least the state the event
/// implies.
pub(super) async fn process_attempt(
    store: &dyn SendStore,
    transport: &dyn Transport,
    queue: &JobQueue,
    bus: &EventBus,
    job: &LeasedJob,
) {
    let email = match store.find(&job.email_id).await {
        Ok(Some(email)) => email,
        Ok(None) => {
            // Row deleted since enqueue: discard the job, no status change,
            // no event
            debug!(email_id = %job.email_id, "Send record missing, discarding job");
            queue.ack(&job.email_id);
            return;
        }
        Err(e) => {
            error!(email_id = %job.email_id, error = %e, "Failed to read send record");
            queue.nack(&job.email_id, &e.to_string());
            return;
        }
    };

    let started = std::time::Instant::now();
    let message = OutboundMessage::from(&email);

    match transport.deliver(&message).await {
        Ok(provider_message_id) => {
            let sent_at = Utc::now();

            let updated = match store
                .mark_sent(&job.email_id, &provider_message_id, sent_at)
                .await
            {
                Ok(updated) => updated,
                Err(e) => {
                    // Provider accepted but the row write failed; retry the
                    // job so bookkeeping catches up (duplicate physical send
                    // is the accepted tradeoff)
                    error!(email_id = %job.email_id, error = %e, "Failed to record sent status");
                    queue.nack(&job.email_id, &e.to_string());
                    return;
                }
            };

            queue.ack(&job.email_id);

            // Publish from the row so a redelivered duplicate reports the
            // original provider id, not a second one
            bus.publish(DomainEvent::EmailSent {
                email_id: updated.id,
                provider_message_id: updated
                    .provider_message_id
                    .unwrap_or(provider_message_id),
                sent_at: updated.sent_at.unwrap_or(sent_at),
            });

            info!(
                email_id = %job.email_id,
                attempt = job.attempt,
                "Message accepted by provider"
            );
            if let Some(m) = courier_metrics::metrics() {
                m.delivery.record_attempt("sent");
                m.delivery.record_sent(started.elapsed().as_secs_f64());
            }
        }
        Err(e) => {
            // FAILED is recorded on every failing attempt, not only the
            // last; a later retry may flip the row back to SENT
            if let Err(store_err) = store.mark_failed(&job.email_id).await {
                error!(email_id = %job.email_id, error = %store_err, "Failed to record failed status");
            }

            if let Some(m) = courier_metrics::metrics() {
                m.delivery.record_attempt("failed");
            }

            match queue.nack(&job.email_id, &e.to_string()) {
                RetryDecision::Scheduled { next_attempt_at } => {
                    warn!(
                        email_id = %job.email_id,
                        attempt = job.attempt,
                        error = %e,
                        next_attempt_at = ?next_attempt_at,
                        "Delivery attempt failed, retry scheduled"
                    );
                    if let Some(m) = courier_metrics::metrics() {
                        m.delivery.record_retrying();
                    }
                }
                RetryDecision::Exhausted => {
                    // The FAILED row is the only durable trace; nobody is
                    // re-notified of exhaustion
                    warn!(
                        email_id = %job.email_id,
                        attempt = job.attempt,
                        error = %e,
                        "Delivery attempts exhausted"
                    );
                    if let Some(m) = courier_metrics::metrics() {
                        m.delivery.record_failed();
                    }
                }
            }
        }
    }
}
