//! The `SendStore` trait: the seam between the pipeline and its persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::EmailId;

use crate::{Email, Result};

/// Persistent table of send records keyed by id, with a uniqueness
/// constraint on the idempotency key.
///
/// All writes are narrow single-row updates; no multi-row transactions are
/// required. `mark_sent` and `mark_failed` enforce lifecycle monotonicity:
/// `provider_message_id` and `sent_at` are set at most once and never
/// cleared, and a `SENT` row is never regressed by a late failing attempt.
#[async_trait]
pub trait SendStore: Send + Sync + std::fmt::Debug {
    /// Insert a new record.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::DuplicateKey`] if a record with the same
    /// idempotency key already exists. This is what resolves a race between
    /// two concurrent identical create requests.
    async fn insert(&self, email: &Email) -> Result<()>;

    /// Look up a record by id.
    async fn find(&self, id: &EmailId) -> Result<Option<Email>>;

    /// Look up a record by its idempotency key.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Email>>;

    /// Record a successful delivery: `status=SENT`, provider message id and
    /// sent-at timestamp. A record that is already `SENT` is returned
    /// unchanged, so redelivered jobs cannot overwrite the original outcome.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::NotFound`] if the record does not exist.
    async fn mark_sent(
        &self,
        id: &EmailId,
        provider_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Email>;

    /// Record a failed delivery attempt: `status=FAILED`. A record that is
    /// already `SENT` is left untouched.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::NotFound`] if the record does not exist.
    async fn mark_failed(&self, id: &EmailId) -> Result<Email>;

    /// List all record ids, sorted.
    async fn list(&self) -> Result<Vec<EmailId>>;
}
