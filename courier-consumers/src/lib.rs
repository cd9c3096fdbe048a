//! Event consumers
//!
//! Each consumer process opens one bus subscription, filters by event type,
//! and applies an idempotent-where-possible side effect. Consumers are
//! decoupled from producers: a handler error is logged and counted, never
//! propagated back to the publisher, and one consumer crashing never blocks
//! the pipeline.

pub mod analytics;
pub mod campaign;
pub mod consumer;

pub use analytics::{
    AnalyticsConsumer, EngagementStore, EngagementSummary, MemoryEngagementStore, OpenEvent,
    ReplyEvent,
};
pub use campaign::CampaignConsumer;
pub use consumer::{ConsumerError, EventConsumer, run};
