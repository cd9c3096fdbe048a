//! Webhook server configuration

use serde::Deserialize;

/// Configuration for the webhook ingestor
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Enable or disable the webhook server
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Address to bind the webhook server
    ///
    /// Common values:
    /// - `[::]:8081` (IPv6 any address, port 8081)
    /// - `127.0.0.1:8081` (localhost only)
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_enabled() -> bool {
    true
}

fn default_listen_address() -> String {
    "[::]:8081".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    5
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen_address: default_listen_address(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
