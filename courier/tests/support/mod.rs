//! Test support utilities for pipeline testing
//!
//! Provides a scripted transport and an in-process harness that runs the
//! full send pipeline: orchestrator, queue, delivery worker, bus, and the
//! analytics consumer.

pub mod harness;
pub mod transport;

pub use harness::PipelineHarness;
pub use transport::{FakeTransport, ScriptedOutcome};
