//! Codec trait, the JSON implementation, and the envelope decode boundary.
//!
//! A codec converts between Rust values and raw frame bytes. The rest of
//! the system only needs something implementing [`Codec`]; swapping JSON
//! for a binary format would not touch the dispatcher or the transport.
//!
//! [`decode_envelope`] is the single place where untrusted frames become
//! typed [`Envelope`]s. It distinguishes three failures:
//!
//! - the frame is not structured data at all → [`ProtocolError::Decode`]
//! - the frame has no `type` tag → [`ProtocolError::MissingKind`]
//! - the tag is not one of the known kinds → [`ProtocolError::UnknownKind`]

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Envelope, ProtocolError, types::EnvelopeKind};

/// A codec that can encode Rust values to bytes and decode bytes back.
///
/// `Send + Sync + 'static` lets one codec instance live inside long-running
/// Tokio tasks (the broker's connection handlers, the client session loop).
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// JSON is what browser clients speak, so this is the default wire format.
///
/// ## Example
///
/// ```rust
/// use tandem_protocol::{decode_envelope, encode_envelope, Envelope, JsonCodec, Username};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::Chat { text: "hi".into(), user: Username::from("alice") };
///
/// let bytes = encode_envelope(&codec, &envelope).unwrap();
/// assert_eq!(decode_envelope(&codec, &bytes).unwrap(), envelope);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Envelope boundary
// ---------------------------------------------------------------------------

/// Just the tag of a frame, read before committing to a variant.
#[derive(Deserialize)]
struct KindPeek {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Encodes one envelope into the bytes of one text frame.
///
/// # Errors
/// Propagates the codec's encode error.
pub fn encode_envelope<C: Codec>(
    codec: &C,
    envelope: &Envelope,
) -> Result<Vec<u8>, ProtocolError> {
    codec.encode(envelope)
}

/// Decodes one frame into a typed [`Envelope`].
///
/// # Errors
/// See the module docs for the three failure classes.
pub fn decode_envelope<C: Codec>(
    codec: &C,
    data: &[u8],
) -> Result<Envelope, ProtocolError> {
    let peek: KindPeek = codec.decode(data)?;
    match peek.kind {
        None => Err(ProtocolError::MissingKind),
        Some(tag) if EnvelopeKind::from_tag(&tag).is_none() => {
            Err(ProtocolError::UnknownKind(tag))
        }
        Some(_) => codec.decode(data),
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ParticipantId, Username};

    #[test]
    fn test_chat_survives_codec() {
        let env = Envelope::Chat {
            text: "hello there".into(),
            user: Username::from("bob"),
        };
        let bytes = encode_envelope(&JsonCodec, &env).unwrap();
        assert_eq!(decode_envelope(&JsonCodec, &bytes).unwrap(), env);
    }

    #[test]
    fn test_encoded_frame_is_utf8_json() {
        let env = Envelope::Disconnected {
            ip: ParticipantId::from("1.2.3.4:5"),
        };
        let bytes = encode_envelope(&JsonCodec, &env).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("\"type\":\"disconnected\""));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = decode_envelope(&JsonCodec, b"not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_non_object_is_decode_error() {
        let err = decode_envelope(&JsonCodec, b"[1,2,3]").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_missing_tag() {
        let err =
            decode_envelope(&JsonCodec, br#"{"text":"hi","user":"a"}"#)
                .unwrap_err();
        assert!(matches!(err, ProtocolError::MissingKind));
    }

    #[test]
    fn test_unknown_tag_is_typed_error() {
        let err = decode_envelope(&JsonCodec, br#"{"type":"teleport","x":1}"#)
            .unwrap_err();
        match err {
            ProtocolError::UnknownKind(tag) => assert_eq!(tag, "teleport"),
            other => panic!("expected UnknownKind, got {other:?}"),
        }
    }

    #[test]
    fn test_known_tag_with_missing_field() {
        let err = decode_envelope(&JsonCodec, br#"{"type":"cursor","x":1,"y":2}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_non_string_tag_is_decode_error() {
        let err =
            decode_envelope(&JsonCodec, br#"{"type":7}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let env = decode_envelope(
            &JsonCodec,
            br#"{"type":"disconnected","ip":"a","reason":"bye"}"#,
        )
        .unwrap();
        assert_eq!(
            env,
            Envelope::Disconnected {
                ip: ParticipantId::from("a")
            }
        );
    }
}
