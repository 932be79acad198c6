//! Unified error type for the Tandem client.

use tandem_protocol::ProtocolError;
use tandem_state::ChatError;
use tandem_transport::TransportError;

use crate::dispatcher::DispatchError;
use crate::identity::AuthError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TandemError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown kind).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A local action was refused before anything was sent.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The chat log refused an entry.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// The HTTP collaborator (login, session, ip lookup) failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The client was started without a participant identity.
    #[error("no local participant identity configured")]
    MissingIdentity,

    /// The session loop has already stopped.
    #[error("client session has stopped")]
    SessionClosed,

    /// A background task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
