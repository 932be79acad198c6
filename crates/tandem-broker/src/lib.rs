//! # Tandem Broker
//!
//! The server side of Tandem: accepts WebSocket connections and fans every
//! valid envelope out to all connected participants, the sender included.
//! When a connection ends, the others are told with a `disconnected`
//! envelope so they can drop that participant's cursor.
//!
//! The broker keeps no history. A participant that joins late sees only
//! what is sent after it connected.

mod handler;
mod server;

pub use server::{Broker, BrokerBuilder, DEFAULT_BIND, DEFAULT_HANDSHAKE_TIMEOUT};

use tandem_transport::TransportError;

/// Errors from the broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Binding, accepting, or talking to a connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
