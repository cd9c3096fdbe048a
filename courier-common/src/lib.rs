pub mod logging;
pub mod status;
pub mod types;

pub use status::SendStatus;
pub use tracing;
pub use types::EmailId;

/// Process-wide control signal, fanned out over a broadcast channel to every
/// serving component (worker, consumers, webhook server).
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
}
