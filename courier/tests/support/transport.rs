//! Scripted transport for exercising retry behavior deterministically.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use courier_delivery::{OutboundMessage, Transport, TransportError};

/// One scripted delivery attempt outcome.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Accept the message with this provider message id
    Succeed(&'static str),
    /// Reject the message with a retryable error
    FailTransient(&'static str),
    /// Reject the message with a non-retryable error
    FailPermanent(&'static str),
}

/// Transport that plays back a fixed script of outcomes, one per attempt.
///
/// Once the script is exhausted every further attempt succeeds with a
/// generated provider message id, so tests only script the interesting
/// prefix.
#[derive(Debug)]
pub struct FakeTransport {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    calls: AtomicUsize,
}

impl FakeTransport {
    pub fn scripted(outcomes: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Transport that accepts everything
    pub fn always_succeeds() -> Self {
        Self::scripted([])
    }

    /// How many delivery attempts have reached this transport
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn deliver(&self, _message: &OutboundMessage) -> Result<String, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let outcome = self.script.lock().unwrap().pop_front();
        match outcome {
            Some(ScriptedOutcome::Succeed(id)) => Ok(id.to_string()),
            Some(ScriptedOutcome::FailTransient(reason)) => {
                Err(TransportError::Transient(reason.to_string()))
            }
            Some(ScriptedOutcome::FailPermanent(reason)) => {
                Err(TransportError::Permanent(reason.to_string()))
            }
            None => Ok(format!("fake-{call}")),
        }
    }
}
