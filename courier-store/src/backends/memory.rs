use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::{EmailId, SendStatus};

use crate::{Email, Result, StoreError, store::SendStore};

/// In-memory store implementation
///
/// Records live in a `HashMap` protected by an `RwLock`, with a secondary
/// map enforcing idempotency-key uniqueness. Primarily intended for testing,
/// but also usable for transient deployments.
///
/// # Capacity Management
/// The store can be configured with a maximum capacity to prevent unbounded
/// memory growth. When capacity is reached, inserts fail with an error.
///
/// # Concurrency
/// Uses `RwLock` for interior mutability and recovers from poisoned locks by
/// converting the poison error into a store error.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<EmailId, Email>>>,
    by_key: Arc<RwLock<HashMap<String, EmailId>>>,
    /// Maximum number of records to store (None = unlimited)
    capacity: Option<usize>,
}

impl MemoryStore {
    /// Create a new empty store with unlimited capacity
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new store with a capacity limit
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Current number of records
    ///
    /// # Panics
    /// Never panics; a poisoned lock is recovered by reading through it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SendStore for MemoryStore {
    async fn insert(&self, email: &Email) -> Result<()> {
        let mut by_key = self.by_key.write()?;
        if by_key.contains_key(&email.idempotency_key) {
            return Err(StoreError::DuplicateKey(email.idempotency_key.clone()));
        }

        let mut records = self.records.write()?;
        if let Some(cap) = self.capacity
            && records.len() >= cap
        {
            return Err(StoreError::Internal(format!(
                "Memory store capacity exceeded: {}/{cap} records",
                records.len()
            )));
        }

        by_key.insert(email.idempotency_key.clone(), email.id);
        records.insert(email.id, email.clone());

        Ok(())
    }

    async fn find(&self, id: &EmailId) -> Result<Option<Email>> {
        Ok(self.records.read()?.get(id).cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Email>> {
        let by_key = self.by_key.read()?;
        let Some(id) = by_key.get(key) else {
            return Ok(None);
        };
        Ok(self.records.read()?.get(id).cloned())
    }

    async fn mark_sent(
        &self,
        id: &EmailId,
        provider_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Email> {
        let mut records = self.records.write()?;
        let email = records.get_mut(id).ok_or(StoreError::NotFound(*id))?;

        // Terminal success is write-once
        if !email.status.is_sent() {
            email.status = SendStatus::Sent;
            email.provider_message_id = Some(provider_message_id.to_string());
            email.sent_at = Some(sent_at);
        }

        Ok(email.clone())
    }

    async fn mark_failed(&self, id: &EmailId) -> Result<Email> {
        let mut records = self.records.write()?;
        let email = records.get_mut(id).ok_or(StoreError::NotFound(*id))?;

        if !email.status.is_sent() {
            email.status = SendStatus::Failed;
        }

        Ok(email.clone())
    }

    async fn list(&self) -> Result<Vec<EmailId>> {
        let mut ids: Vec<EmailId> = self.records.read()?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
