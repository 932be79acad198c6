//! Transport layer for Tandem.
//!
//! Provides the [`Connection`], [`Connector`] and [`Transport`] traits that
//! abstract over the network, and the [`TransportChannel`] that owns one
//! client connection through connect, reconnect and teardown.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client and server via `tokio-tungstenite`

mod channel;
mod error;
mod reconnect;
#[cfg(feature = "websocket")]
mod websocket;

pub use channel::{
    ChannelHandle, CloseReason, FrameSink, SendOutcome, TransportChannel,
    TransportEvent,
};
pub use error::TransportError;
pub use reconnect::{DEFAULT_RECONNECT_DELAY, ReconnectPolicy};
#[cfg(feature = "websocket")]
pub use websocket::{
    PendingWebSocket, WebSocketConnection, WebSocketConnector, WebSocketTransport,
};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle state of a client's connection to the broker.
///
/// ```text
///   Disconnected ──connect()──→ Connecting ──open──→ Connected
///        ↑                          │                    │
///        └────── connect failed ────┘                    │
///        └──────────────── close / error ────────────────┘
/// ```
///
/// Outbound sends are only permitted in `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        };
        f.write_str(label)
    }
}

/// Accepts new incoming connections (the broker side).
pub trait Transport: Send + Sync + 'static {
    /// An accepted socket, not yet upgraded to a [`Connection`].
    type Incoming: Handshake;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming socket.
    ///
    /// The protocol handshake is not run here. Callers complete it with
    /// [`Handshake::complete`] in the connection's own task, so a peer
    /// that never speaks cannot hold up the accept loop.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Incoming, Self::Error>> + Send;
}

/// The second half of accepting: turns a raw socket into a [`Connection`].
pub trait Handshake: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the protocol handshake with the peer.
    fn complete(
        self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// Opens outbound connections (the client side).
///
/// [`TransportChannel`] calls this once per connection attempt.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;
    /// The error type for a failed attempt.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Attempts to establish one connection.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single message-oriented connection. Each message is one frame.
///
/// The futures are `Send` so generic code over `Connection` can be
/// spawned onto the multi-threaded Tokio runtime.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }

    #[test]
    fn test_connection_state_defaults_to_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
    }
}
