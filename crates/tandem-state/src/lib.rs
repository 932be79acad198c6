//! Client-side state for Tandem.
//!
//! This crate holds what a client knows about the shared session:
//!
//! 1. **Presence**: other participants' last known cursor ([`PresenceStore`])
//! 2. **Chat**: the ordered, append-only chat history ([`ChatLog`])
//! 3. **Geometry**: clamping coordinates to the viewport ([`Viewport`])
//! 4. **Rendering**: the [`Surface`] trait the render layer implements,
//!    and the [`PresenceRenderer`] that drives it without flicker
//!
//! Everything here is synchronous and owned by a single event-handling
//! context, so there is no locking.
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← mutates presence and chat from decoded envelopes
//!     ↕
//! State (this crate)  ← pure data + render diffing
//!     ↕
//! Protocol (below)    ← provides ParticipantId, Username
//! ```

mod chat;
mod error;
mod geometry;
mod presence;
mod render;

pub use chat::{ChatEntry, ChatLog, validate_text};
pub use error::ChatError;
pub use geometry::{DEFAULT_CURSOR_SIZE, Position, Viewport};
pub use presence::{CursorView, PresenceSnapshot, PresenceStore};
pub use render::{MemorySurface, PresenceRenderer, Surface};
