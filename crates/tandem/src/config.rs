//! Client configuration.

use serde::{Deserialize, Serialize};
use tandem_state::Viewport;
use tandem_transport::ReconnectPolicy;

/// Broker endpoint used when none is configured.
pub const DEFAULT_BROKER_URL: &str = "ws://127.0.0.1:8080/ws";

/// Configuration for a [`TandemClient`](crate::TandemClient).
///
/// Every field has a default, so a config file only needs the fields it
/// changes:
///
/// ```rust
/// use tandem::ClientConfig;
///
/// let cfg: ClientConfig =
///     serde_json::from_str(r#"{"broker_url":"ws://10.0.0.2:8080/ws"}"#).unwrap();
/// assert_eq!(cfg.broker_url, "ws://10.0.0.2:8080/ws");
/// assert_eq!(cfg.input_buffer, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The single broker endpoint (`ws://` or `wss://`).
    pub broker_url: String,

    /// When to retry after the connection drops.
    pub reconnect: ReconnectPolicy,

    /// Local window size; cursors are clamped to it.
    pub viewport: Viewport,

    /// Capacity of the local input queue. Pointer moves that find it full
    /// are dropped.
    pub input_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            viewport: Viewport::default(),
            input_buffer: 1024,
        }
    }
}

impl ClientConfig {
    /// Sets the broker URL.
    pub fn broker_url(mut self, url: impl Into<String>) -> Self {
        self.broker_url = url.into();
        self
    }

    /// Sets the reconnect policy.
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Sets the viewport.
    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}
