//! The render layer seam.
//!
//! The client never draws anything itself. It drives a [`Surface`]: a
//! browser DOM, a terminal, a GUI, or the in-memory [`MemorySurface`].
//!
//! Cursor rendering goes through [`PresenceRenderer`], which remembers what
//! it last drew and only touches elements whose state changed:
//!
//! - a participant seen for the first time → `place_cursor` (create)
//! - a participant whose position changed → `place_cursor` (update in place)
//! - a participant no longer in the store → `remove_cursor`
//! - anything else → nothing
//!
//! Rendering twice without a state change is therefore a no-op.

use std::collections::BTreeMap;

use tandem_protocol::ParticipantId;
use tandem_transport::ConnectionState;

use crate::{ChatEntry, Position, PresenceStore, Viewport};

/// Something the client can render onto.
pub trait Surface {
    /// Shows the connection status indicator.
    fn set_status(&mut self, state: ConnectionState);

    /// Creates the cursor element for `identity`, or moves the existing one.
    fn place_cursor(&mut self, identity: &ParticipantId, at: Position);

    /// Deletes the cursor element for `identity`.
    fn remove_cursor(&mut self, identity: &ParticipantId);

    /// Displays one new chat line below the existing ones.
    fn append_chat_line(&mut self, entry: &ChatEntry);

    /// Shows a blocking notice to the local user.
    fn notify(&mut self, notice: &str);
}

/// Diffs the presence store against what is already on the surface.
#[derive(Debug, Default)]
pub struct PresenceRenderer {
    drawn: BTreeMap<ParticipantId, Position>,
}

impl PresenceRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the surface in line with `store`, excluding `local`, with
    /// every position clamped to `viewport`.
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        store: &PresenceStore,
        local: &ParticipantId,
        viewport: &Viewport,
        surface: &mut S,
    ) {
        let mut next = BTreeMap::new();

        for cursor in store.all_except(local) {
            let at = viewport.clamp_position(cursor.position);
            if self.drawn.get(cursor.identity) != Some(&at) {
                surface.place_cursor(cursor.identity, at);
            }
            next.insert(cursor.identity.clone(), at);
        }

        for gone in self.drawn.keys().filter(|id| !next.contains_key(*id)) {
            tracing::trace!(identity = %gone, "removing cursor element");
            surface.remove_cursor(gone);
        }

        self.drawn = next;
    }

    /// Identities currently drawn.
    pub fn drawn(&self) -> impl Iterator<Item = &ParticipantId> {
        self.drawn.keys()
    }
}

// ---------------------------------------------------------------------------
// MemorySurface
// ---------------------------------------------------------------------------

/// A [`Surface`] that keeps everything in memory.
///
/// Useful headless and in tests: it counts element creations, updates and
/// removals so flicker-free rendering can be asserted.
#[derive(Debug, Default)]
pub struct MemorySurface {
    status: ConnectionState,
    cursors: BTreeMap<ParticipantId, Position>,
    chat_lines: Vec<String>,
    notices: Vec<String>,
    created: usize,
    updated: usize,
    removed: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionState {
        self.status
    }

    /// The status indicator text.
    pub fn status_line(&self) -> String {
        format!("WebSocket Status: {}", self.status)
    }

    /// Cursor elements currently on the surface.
    pub fn cursors(&self) -> &BTreeMap<ParticipantId, Position> {
        &self.cursors
    }

    /// Rendered chat lines, oldest first.
    pub fn chat_lines(&self) -> &[String] {
        &self.chat_lines
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Number of cursor elements ever created.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Number of in-place cursor moves.
    pub fn updated(&self) -> usize {
        self.updated
    }

    /// Number of cursor elements removed.
    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl Surface for MemorySurface {
    fn set_status(&mut self, state: ConnectionState) {
        self.status = state;
    }

    fn place_cursor(&mut self, identity: &ParticipantId, at: Position) {
        match self.cursors.insert(identity.clone(), at) {
            None => self.created += 1,
            Some(_) => self.updated += 1,
        }
    }

    fn remove_cursor(&mut self, identity: &ParticipantId) {
        if self.cursors.remove(identity).is_some() {
            self.removed += 1;
        }
    }

    fn append_chat_line(&mut self, entry: &ChatEntry) {
        self.chat_lines.push(entry.to_string());
    }

    fn notify(&mut self, notice: &str) {
        self.notices.push(notice.to_owned());
    }
}
