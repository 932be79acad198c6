//! Error types for the protocol layer.
//!
//! When you see a `ProtocolError`, the problem is in turning frames into
//! envelopes (or back), never in networking or in client state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an envelope into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a value).
    ///
    /// Common causes: malformed JSON, missing fields, a negative or
    /// fractional coordinate, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame carried a `type` tag that is not one of the known kinds.
    #[error("unknown envelope kind: {0:?}")]
    UnknownKind(String),

    /// The frame had no `type` tag at all.
    #[error("envelope has no type tag")]
    MissingKind,
}
