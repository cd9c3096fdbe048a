use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_common::{EmailId, SendStatus, internal};
use dashmap::DashMap;
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use crate::{
    Email, Result, StoreError,
    error::{SerializationError, ValidationError},
    store::SendStore,
};

/// File-based store implementation
///
/// Each record is a single `{id}.bin` bincode file in the store directory.
/// The id is a 26-character ULID, so filenames are globally unique and
/// lexicographically ordered by creation time.
///
/// # Atomicity
/// All writes use the write-to-temp-then-rename pattern so a crash mid-write
/// never leaves a partial record on disk.
///
/// # Idempotency index
/// The idempotency-key uniqueness constraint is held in an in-process
/// `DashMap` rebuilt from the record files at `init()`. Reserving the key in
/// the index before touching disk is what rejects the second of two
/// concurrent identical inserts.
///
/// # Status monotonicity
/// `mark_sent` and `mark_failed` are read-check-write sequences over the
/// record file, so they run under `mutate_lock`. Without it, two concurrent
/// workers redelivering the same job (an expired lease) could interleave and
/// a stale `mark_failed` would overwrite a committed `SENT` row.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    index: DashMap<String, EmailId>,
    mutate_lock: tokio::sync::Mutex<()>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/courier/sends"),
            index: DashMap::new(),
            mutate_lock: tokio::sync::Mutex::new(()),
        }
    }
}

// Custom Deserialize with path validation, so a bad config fails at load
impl<'de> Deserialize<'de> for FileStore {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct FileStoreHelper {
            path: PathBuf,
        }

        let helper = FileStoreHelper::deserialize(deserializer)?;
        Self::validate_path(&helper.path).map_err(serde::de::Error::custom)?;

        Ok(Self {
            path: helper.path,
            index: DashMap::new(),
            mutate_lock: tokio::sync::Mutex::new(()),
        })
    }
}

impl FileStore {
    /// Create a store rooted at `path`
    ///
    /// # Errors
    /// If the path fails validation
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        Self::validate_path(&path)?;
        Ok(Self {
            path,
            index: DashMap::new(),
            mutate_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Validate a store path
    ///
    /// Rejects traversal components and sensitive system prefixes.
    fn validate_path(path: &Path) -> std::result::Result<(), ValidationError> {
        for component in path.components() {
            if component == std::path::Component::ParentDir {
                return Err(ValidationError::InvalidConfiguration(format!(
                    "Store path cannot contain '..' components: {}",
                    path.display()
                )));
            }
        }

        let sensitive_prefixes = ["/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev"];
        for prefix in &sensitive_prefixes {
            if path.starts_with(prefix) {
                return Err(ValidationError::InvalidConfiguration(format!(
                    "Store path cannot be in system directory {prefix}: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Initialize the store: create the directory if needed and rebuild the
    /// idempotency-key index from the record files.
    ///
    /// Call once at process start; fails fast on permission problems.
    pub async fn init(&self) -> Result<()> {
        internal!("Initialising send record store at {}", self.path.display());

        if !fs::try_exists(&self.path).await? {
            fs::create_dir_all(&self.path).await?;
        } else if !self.path.is_dir() {
            return Err(ValidationError::NotDirectory(self.path.display().to_string()).into());
        }

        let mut entries = fs::read_dir(&self.path).await?;
        let mut indexed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(EmailId::from_filename) else {
                continue;
            };
            match self.read_record(&id).await {
                Ok(email) => {
                    self.index.insert(email.idempotency_key.clone(), id);
                    indexed += 1;
                }
                Err(e) => {
                    warn!(email_id = %id, error = %e, "Skipping unreadable record during index rebuild");
                }
            }
        }

        internal!("Send record store ready, {indexed} records indexed");
        Ok(())
    }

    fn record_path(&self, id: &EmailId) -> PathBuf {
        self.path.join(format!("{id}.bin"))
    }

    async fn read_record(&self, id: &EmailId) -> Result<Email> {
        let bytes = match fs::read(self.record_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(*id));
            }
            Err(e) => return Err(e.into()),
        };

        let (email, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(SerializationError::Decode)?;
        Ok(email)
    }

    async fn write_record(&self, email: &Email) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(email, bincode::config::standard())
            .map_err(SerializationError::Encode)?;

        // Atomic write: temp file in the same directory, then rename
        let tmp = self.path.join(format!("{}.bin.tmp", email.id));
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, self.record_path(&email.id)).await?;

        Ok(())
    }
}

#[async_trait]
impl SendStore for FileStore {
    async fn insert(&self, email: &Email) -> Result<()> {
        // Reserve the key first so a concurrent duplicate loses before any
        // disk write happens
        match self.index.entry(email.idempotency_key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(StoreError::DuplicateKey(email.idempotency_key.clone()));
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(email.id);
            }
        }

        if let Err(e) = self.write_record(email).await {
            self.index.remove(&email.idempotency_key);
            return Err(e);
        }

        Ok(())
    }

    async fn find(&self, id: &EmailId) -> Result<Option<Email>> {
        match self.read_record(id).await {
            Ok(email) => Ok(Some(email)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Email>> {
        let Some(id) = self.index.get(key).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.find(&id).await
    }

    async fn mark_sent(
        &self,
        id: &EmailId,
        provider_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Email> {
        // The is_sent check and the write must not interleave with another
        // mutation of the same row
        let _guard = self.mutate_lock.lock().await;
        let mut email = self.read_record(id).await?;

        if !email.status.is_sent() {
            email.status = SendStatus::Sent;
            email.provider_message_id = Some(provider_message_id.to_string());
            email.sent_at = Some(sent_at);
            self.write_record(&email).await?;
        }

        Ok(email)
    }

    async fn mark_failed(&self, id: &EmailId) -> Result<Email> {
        let _guard = self.mutate_lock.lock().await;
        let mut email = self.read_record(id).await?;

        if !email.status.is_sent() {
            email.status = SendStatus::Failed;
            self.write_record(&email).await?;
        }

        Ok(email)
    }

    async fn list(&self) -> Result<Vec<EmailId>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = entry.file_name().to_str().and_then(EmailId::from_filename) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
