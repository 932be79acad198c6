//! Wire protocol for Tandem.
//!
//! This crate defines what travels between a client and the broker:
//!
//! - **Types** ([`Envelope`], [`ParticipantId`], [`Username`]): the three
//!   message kinds and the identities they carry.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong at the decode
//!   boundary.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and client
//! state (presence and chat). It knows nothing about connections or
//! rendering.
//!
//! ```text
//! Transport (frames) → Protocol (Envelope) → Dispatcher (presence / chat)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// Users write `use tandem_protocol::Envelope` instead of reaching into
// `tandem_protocol::types::Envelope`.

pub use codec::{Codec, decode_envelope, encode_envelope};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Envelope, EnvelopeKind, ParticipantId, Username};
