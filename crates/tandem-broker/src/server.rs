//! `Broker` builder and accept loop.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tandem_protocol::JsonCodec;
use tandem_transport::{
    ConnectionId, Handshake, PendingWebSocket, Transport, WebSocketConnection,
    WebSocketTransport,
};
use tokio::sync::Mutex;

use crate::BrokerError;
use crate::handler::handle_connection;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// How long an accepted socket has to complete the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared broker state passed to each connection task.
pub(crate) struct BrokerState {
    pub(crate) connections: Mutex<HashMap<ConnectionId, Arc<WebSocketConnection>>>,
    pub(crate) codec: JsonCodec,
}

/// Builder for a [`Broker`].
///
/// ```rust,no_run
/// use tandem_broker::Broker;
///
/// # async fn demo() -> Result<(), tandem_broker::BrokerError> {
/// let broker = Broker::builder().bind("127.0.0.1:8080").build().await?;
/// broker.run().await
/// # }
/// ```
pub struct BrokerBuilder {
    bind_addr: String,
    handshake_timeout: Duration,
}

impl BrokerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a new socket may take to finish the WebSocket upgrade
    /// before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener.
    pub async fn build(self) -> Result<Broker, BrokerError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let state = Arc::new(BrokerState {
            connections: Mutex::new(HashMap::new()),
            codec: JsonCodec,
        });
        Ok(Broker {
            transport,
            state,
            handshake_timeout: self.handshake_timeout,
        })
    }
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound broker. Call [`run()`](Self::run) to start accepting.
pub struct Broker {
    transport: WebSocketTransport,
    state: Arc<BrokerState>,
    handshake_timeout: Duration,
}

impl Broker {
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::new()
    }

    /// Returns the local address the broker is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, BrokerError> {
        Ok(self.transport.local_addr()?)
    }

    /// Accepts connections and spawns a handler task for each. Runs until
    /// the process is terminated or the future is dropped.
    ///
    /// The WebSocket upgrade runs inside the spawned task, bounded by the
    /// handshake timeout, so the loop goes straight back to accepting.
    pub async fn run(mut self) -> Result<(), BrokerError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "broker running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    let timeout = self.handshake_timeout;
                    tokio::spawn(async move {
                        let Some(conn) = upgrade(incoming, timeout).await else {
                            return;
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Completes the WebSocket upgrade, giving up after `timeout`.
async fn upgrade(incoming: PendingWebSocket, timeout: Duration) -> Option<WebSocketConnection> {
    let peer = incoming.peer_addr();
    match tokio::time::timeout(timeout, incoming.complete()).await {
        Ok(Ok(conn)) => Some(conn),
        Ok(Err(e)) => {
            tracing::debug!(%peer, error = %e, "handshake failed");
            None
        }
        Err(_) => {
            tracing::debug!(%peer, ?timeout, "handshake timed out");
            None
        }
    }
}
