//! # Tandem
//!
//! Real-time presence and chat for clients sharing one broker.
//!
//! Every connected client sees the others' live cursor positions and can
//! exchange chat messages. This crate is the client: it keeps one
//! WebSocket connection to the broker alive, turns local pointer moves and
//! chat submissions into envelopes, and applies inbound envelopes to a
//! presence store and a chat log that are drawn onto a
//! [`Surface`](tandem_state::Surface).
//!
//! ```text
//!  pointer / chat ─→ SyncSession ─→ Dispatcher ─→ codec ─→ TransportChannel ─→ broker
//!                                                                               │
//!  Surface ←─ PresenceRenderer / ChatLog ←─ Dispatcher ←─ codec ←───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tandem::prelude::*;
//!
//! # async fn demo() -> Result<(), TandemError> {
//! let api = HttpCollaborator::new("http://127.0.0.1:8080")?;
//! let client = TandemClient::builder()
//!     .resolve_identity(&api)
//!     .await?
//!     .start(MemorySurface::new())?;
//!
//! client.pointer_moved(120, 80);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod dispatcher;
mod error;
mod identity;
mod session;

pub use client::{ClientHandle, TandemClient, TandemClientBuilder};
pub use config::{ClientConfig, DEFAULT_BROKER_URL};
pub use dispatcher::{Applied, DispatchError, Dispatcher};
pub use error::TandemError;
pub use identity::{AuthError, HttpCollaborator, LocalIdentity, SessionStatus};
pub use session::{
    GAVE_UP_NOTICE, LocalEvent, PointerCapture, SyncSession, UNAUTHENTICATED_NOTICE,
};

pub use tandem_protocol as protocol;
pub use tandem_state as state;
pub use tandem_transport as transport;

/// Common imports for applications embedding the client.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientHandle, HttpCollaborator, LocalEvent, LocalIdentity,
        SyncSession, TandemClient, TandemError,
    };
    pub use tandem_protocol::{Envelope, ParticipantId, Username};
    pub use tandem_state::{ChatEntry, MemorySurface, Position, Surface, Viewport};
    pub use tandem_transport::{ConnectionState, ReconnectPolicy};
}
