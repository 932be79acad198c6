//! Routing between the wire and local state.
//!
//! Inbound frames are decoded and applied to the presence store or the
//! chat log:
//!
//! | Envelope       | Effect                               |
//! |----------------|--------------------------------------|
//! | `Chat`         | `ChatLog::append(user, text)`        |
//! | `CursorUpdate` | `PresenceStore::upsert(ip, x, y)`    |
//! | `Disconnected` | `PresenceStore::remove(ip)`          |
//!
//! Outbound, local chat submissions and pointer moves become envelopes
//! handed to a [`FrameSink`].

use tandem_protocol::{
    Codec, Envelope, JsonCodec, ParticipantId, ProtocolError, Username,
    decode_envelope, encode_envelope,
};
use tandem_state::{ChatError, ChatLog, Position, PresenceStore, Viewport, validate_text};
use tandem_transport::{ConnectionState, FrameSink, SendOutcome};

use crate::LocalIdentity;

/// Why a local action was refused before anything was sent.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Chat requires a known username.
    #[error("no local username; log in before sending chat")]
    Unauthenticated,

    /// The chat text is empty after trimming.
    #[error("chat message is empty")]
    EmptyMessage,

    /// The envelope could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// What an inbound frame changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// One entry was appended to the chat log.
    Chat,
    /// The presence store changed.
    Presence,
}

/// Owns the presence store, the chat log and the local identity.
#[derive(Debug)]
pub struct Dispatcher<C: Codec = JsonCodec> {
    codec: C,
    identity: LocalIdentity,
    viewport: Viewport,
    presence: PresenceStore,
    chat: ChatLog,
}

impl Dispatcher<JsonCodec> {
    /// Creates a dispatcher speaking JSON.
    pub fn new(identity: LocalIdentity, viewport: Viewport) -> Self {
        Self::with_codec(JsonCodec, identity, viewport)
    }
}

impl<C: Codec> Dispatcher<C> {
    pub fn with_codec(codec: C, identity: LocalIdentity, viewport: Viewport) -> Self {
        Self {
            codec,
            identity,
            viewport,
            presence: PresenceStore::new(),
            chat: ChatLog::new(),
        }
    }

    /// Decodes one inbound frame and applies it.
    ///
    /// Returns `None` when nothing changed: the frame was malformed, the
    /// chat text was empty, the cursor was our own, or the departed
    /// participant was unknown. None of these affect the connection.
    pub fn dispatch_inbound(&mut self, frame: &[u8]) -> Option<Applied> {
        let envelope = match decode_envelope(&self.codec, frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, len = frame.len(), "dropping undecodable frame");
                return None;
            }
        };

        match envelope {
            Envelope::Chat { text, user } => match self.chat.append(user, text) {
                Ok(entry) => {
                    tracing::debug!(author = %entry.author, "chat received");
                    Some(Applied::Chat)
                }
                Err(ChatError::EmptyText) => {
                    tracing::debug!("ignoring empty chat message");
                    None
                }
            },
            Envelope::CursorUpdate { x, y, ip } => {
                if ip == self.identity.participant {
                    return None;
                }
                let at = self.viewport.clamp_position(Position::new(x, y));
                if self.presence.upsert(ip.clone(), at) {
                    tracing::debug!(identity = %ip, "participant appeared");
                }
                Some(Applied::Presence)
            }
            Envelope::Disconnected { ip } => {
                if self.presence.remove(&ip) {
                    tracing::debug!(identity = %ip, "participant left");
                    Some(Applied::Presence)
                } else {
                    None
                }
            }
        }
    }

    /// Sends a chat message as the local user.
    ///
    /// # Errors
    /// [`DispatchError::EmptyMessage`] for whitespace-only text and
    /// [`DispatchError::Unauthenticated`] without a username. In both cases
    /// nothing is sent.
    pub fn submit_chat<K: FrameSink + ?Sized>(
        &self,
        sink: &K,
        text: &str,
    ) -> Result<SendOutcome, DispatchError> {
        validate_text(text).map_err(|_| DispatchError::EmptyMessage)?;
        let user = self
            .identity
            .username
            .clone()
            .ok_or(DispatchError::Unauthenticated)?;

        let frame = encode_envelope(
            &self.codec,
            &Envelope::Chat {
                text: text.to_owned(),
                user,
            },
        )?;
        Ok(sink.send(frame))
    }

    /// Broadcasts the local pointer position, clamped to the viewport.
    ///
    /// Dropped without encoding when the sink is not connected.
    pub fn pointer_moved<K: FrameSink + ?Sized>(
        &self,
        sink: &K,
        x: i64,
        y: i64,
    ) -> Result<SendOutcome, DispatchError> {
        if sink.state() != ConnectionState::Connected {
            return Ok(SendOutcome::Dropped);
        }
        let at = self.viewport.clamp(x, y);
        let frame = encode_envelope(
            &self.codec,
            &Envelope::CursorUpdate {
                x: at.x,
                y: at.y,
                ip: self.identity.participant.clone(),
            },
        )?;
        Ok(sink.send(frame))
    }

    /// Sets or clears the local username (login, logout).
    pub fn set_username(&mut self, username: Option<Username>) {
        self.identity.username = username;
    }

    /// Replaces the viewport. Stored positions are re-clamped on render.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.identity.participant
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn presence(&self) -> &PresenceStore {
        &self.presence
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }
}
