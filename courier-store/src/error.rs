//! Error types for the courier-store crate.

use std::io;

use courier_common::EmailId;
use thiserror::Error;

/// Top-level store error type.
///
/// All store operations return this error, which categorizes failures into
/// I/O, serialization, validation, and logical errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O operation failed (file read/write/delete).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Send record not found.
    #[error("Email not found: {0}")]
    NotFound(EmailId),

    /// A record with this idempotency key already exists.
    ///
    /// The store's uniqueness constraint; the orchestrator catches this and
    /// falls back to reading the existing row.
    #[error("Duplicate idempotency key: {0}")]
    DuplicateKey(String),

    /// Store directory validation failed.
    #[error("Store validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serialization and deserialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Bincode serialization failed.
    #[error("Bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Bincode deserialization failed.
    #[error("Bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// Record data is corrupted or incomplete.
    #[error("Corrupted record data: {0}")]
    Corrupted(String),
}

/// Store directory validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Store path does not exist.
    #[error("Store path does not exist: {0}")]
    PathNotFound(String),

    /// Store path is not a directory.
    #[error("Store path is not a directory: {0}")]
    NotDirectory(String),

    /// Invalid store configuration.
    #[error("Invalid store configuration: {0}")]
    InvalidConfiguration(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

// Convenience conversion for lock poisoning
impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}
