//! Send record store: the single source of truth for send status.
//!
//! Every send is a durable [`Email`] row keyed by a caller-supplied
//! idempotency key. Rows are created in `PENDING_SEND` by the orchestrator
//! and moved to `SENT` or `FAILED` exclusively by the delivery worker.

pub mod backends;
pub mod error;
pub mod record;
pub mod store;

pub use backends::{FileStore, MemoryStore};
pub use error::{Result, SerializationError, StoreError, ValidationError};
pub use record::{Email, SendPayload};
pub use store::SendStore;
