//! Core protocol types for Tandem's wire format.
//!
//! Every type in this module gets serialized, sent to the broker, fanned
//! out, and deserialized on every other client. The JSON shapes here are
//! the contract with browser clients, so the serde attributes matter as
//! much as the Rust types.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of a connected participant (its network address).
///
/// Only meaningful for the lifetime of one connection: a reused address
/// does not imply the same logical user across reconnects.
///
/// `#[serde(transparent)]` keeps the wire form a plain string, so
/// `ParticipantId("10.0.0.7:51234")` travels as `"10.0.0.7:51234"`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Creates an identifier from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// The authenticated username that authors chat messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    /// Creates a username from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Username {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Envelope: the top-level wire format
// ---------------------------------------------------------------------------

/// One discrete wire message. Every frame carries exactly one envelope.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON:
///
/// ```text
/// { "type": "message",      "text": "hi", "user": "alice" }
/// { "type": "cursor",       "x": 40, "y": 12, "ip": "10.0.0.7:51234" }
/// { "type": "disconnected", "ip": "10.0.0.7:51234" }
/// ```
///
/// Coordinates are `u32`, so a negative or fractional coordinate fails
/// at the decode boundary instead of leaking into the presence store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// A chat line authored by `user`.
    #[serde(rename = "message")]
    Chat { text: String, user: Username },

    /// The latest pointer position of participant `ip`.
    #[serde(rename = "cursor")]
    CursorUpdate { x: u32, y: u32, ip: ParticipantId },

    /// Participant `ip` left; its cursor should disappear.
    #[serde(rename = "disconnected")]
    Disconnected { ip: ParticipantId },
}

impl Envelope {
    /// Returns which of the three kinds this envelope is.
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::Chat { .. } => EnvelopeKind::Chat,
            Envelope::CursorUpdate { .. } => EnvelopeKind::CursorUpdate,
            Envelope::Disconnected { .. } => EnvelopeKind::Disconnected,
        }
    }
}

/// The closed set of envelope kinds, keyed by their wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Chat,
    CursorUpdate,
    Disconnected,
}

impl EnvelopeKind {
    /// The value of the `type` field for this kind.
    pub fn tag(self) -> &'static str {
        match self {
            EnvelopeKind::Chat => "message",
            EnvelopeKind::CursorUpdate => "cursor",
            EnvelopeKind::Disconnected => "disconnected",
        }
    }

    /// Looks up a kind by its wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "message" => Some(EnvelopeKind::Chat),
            "cursor" => Some(EnvelopeKind::CursorUpdate),
            "disconnected" => Some(EnvelopeKind::Disconnected),
            _ => None,
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =========================================================================
// Tests
// =========================================================================
