//! Event bus for email lifecycle events
//!
//! One shared broadcast channel carries every published [`DomainEvent`] to
//! every live subscriber; filtering to the event types a consumer cares
//! about happens subscriber-side. Delivery is best-effort and at-most-once:
//! a publish with no live subscriber is dropped (and counted), and there is
//! no backlog or replay. All bus consumers hold derived state, never the
//! source of truth, so a lost event degrades analytics freshness without
//! ever blocking a send.

pub mod bus;
pub mod event;

pub use bus::{EventBus, Subscription};
pub use event::{DomainEvent, EventFilter, EventKind};
