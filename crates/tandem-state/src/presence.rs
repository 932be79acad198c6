//! The presence store: who is pointing where.
//!
//! One entry per currently known remote participant, last write wins. The
//! store is ordered by identity so rendering walks it in a stable order.

use std::collections::BTreeMap;
use std::collections::btree_map;

use tandem_protocol::ParticipantId;

use crate::Position;

/// Maps participant identity to last known cursor position.
#[derive(Debug, Clone, Default)]
pub struct PresenceStore {
    cursors: BTreeMap<ParticipantId, Position>,
}

impl PresenceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites the entry for `identity`.
    ///
    /// Returns `true` if the participant was not known before.
    pub fn upsert(&mut self, identity: ParticipantId, position: Position) -> bool {
        self.cursors.insert(identity, position).is_none()
    }

    /// Deletes the entry for `identity`. Returns whether one existed.
    pub fn remove(&mut self, identity: &ParticipantId) -> bool {
        self.cursors.remove(identity).is_some()
    }

    /// Last known position of `identity`.
    pub fn get(&self, identity: &ParticipantId) -> Option<Position> {
        self.cursors.get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Forgets every participant.
    pub fn clear(&mut self) {
        self.cursors.clear();
    }

    /// Every cursor except `local`'s, as a lazy sequence.
    ///
    /// The snapshot reads the store as it is at iteration time; call this
    /// again (or clone the snapshot) to walk it again.
    pub fn all_except<'a>(&'a self, local: &'a ParticipantId) -> PresenceSnapshot<'a> {
        PresenceSnapshot {
            inner: self.cursors.iter(),
            local,
        }
    }
}

/// One cursor as yielded by [`PresenceSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorView<'a> {
    pub identity: &'a ParticipantId,
    pub position: Position,
}

/// Lazy, cloneable iterator over remote cursors.
#[derive(Debug, Clone)]
pub struct PresenceSnapshot<'a> {
    inner: btree_map::Iter<'a, ParticipantId, Position>,
    local: &'a ParticipantId,
}

impl<'a> Iterator for PresenceSnapshot<'a> {
    type Item = CursorView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for (identity, position) in self.inner.by_ref() {
            if identity != self.local {
                return Some(CursorView {
                    identity,
                    position: *position,
                });
            }
        }
        None
    }
}
