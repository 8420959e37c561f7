use cola::{Anchor, AnchorBias, Deletion, Insertion, Replica, ReplicaId};
use crop::Rope;
use std::fmt;
use std::ops::Range;

use crate::core::{utf16_len, ActorId, IndexRange, TimeTicket};

/// A CRDT-stable reference to a position in a [`Text`]
#[derive(Debug, Clone)]
pub struct TextPos(Anchor);

/// A pair of CRDT-stable positions.
///
/// Unlike an [`IndexRange`], it keeps pointing at the same characters while
/// other participants insert or delete text around it.
#[derive(Debug, Clone)]
pub struct PosRange {
    /// Creation ticket of the text the positions belong to
    pub text: TimeTicket,
    pub from: TextPos,
    pub to: TextPos,
}

/// Shared text field: a cola replica tracking the CRDT state, with the
/// characters themselves stored in a rope.
///
/// All offsets are UTF-16 code units.
#[derive(Debug, Clone)]
pub struct Text {
    /// Ticket of the operation that created this text
    created: TimeTicket,
    replica: Replica,
    rope: Rope,
}

impl Text {
    /// Create an empty text owned by the creating actor
    pub(crate) fn new(created: TimeTicket) -> Self {
        Self {
            created,
            replica: Replica::new(created.actor.0 as ReplicaId, 0),
            rope: Rope::new(),
        }
    }

    /// Join a text created elsewhere, starting from the creator's empty replica
    pub(crate) fn join(created: TimeTicket, origin: &Replica, actor: ActorId) -> Self {
        Self {
            created,
            replica: origin.fork(actor.0 as ReplicaId),
            rope: Rope::new(),
        }
    }

    /// Fork this text for another actor, keeping the current content
    pub(crate) fn fork(&self, actor: ActorId) -> Self {
        Self {
            created: self.created,
            replica: self.replica.fork(actor.0 as ReplicaId),
            rope: self.rope.clone(),
        }
    }

    pub(crate) fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn created(&self) -> TimeTicket {
        self.created
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.rope.utf16_len()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.byte_len() == 0
    }

    /// Copy the text between two offsets
    pub fn slice(&self, from: usize, to: usize) -> String {
        let start = self.byte_of(from);
        let end = self.byte_of(to);
        self.rope.byte_slice(start..end).to_string()
    }

    fn byte_of(&self, offset: usize) -> usize {
        self.rope.byte_of_utf16_code_unit(offset.min(self.len()))
    }

    /// Insert locally and return the insertion to broadcast
    pub(crate) fn insert_local(&mut self, at: usize, text: &str) -> Insertion {
        let insertion = self.replica.inserted(at, utf16_len(text));
        let byte = self.byte_of(at);
        self.rope.insert(byte, text);
        insertion
    }

    /// Delete locally and return the deletion to broadcast
    pub(crate) fn delete_local(&mut self, from: usize, to: usize) -> Deletion {
        let deletion = self.replica.deleted(from..to);
        let range = self.byte_of(from)..self.byte_of(to);
        self.rope.delete(range);
        deletion
    }

    /// Integrate a remote insertion and return the offset it landed at
    pub(crate) fn integrate_insertion(&mut self, insertion: &Insertion, text: &str) -> Option<usize> {
        let offset = self.replica.integrate_insertion(insertion)?;
        let byte = self.byte_of(offset);
        self.rope.insert(byte, text);
        Some(offset)
    }

    /// Integrate a remote deletion and return the deleted ranges, ascending,
    /// in the coordinates of the text before the deletion
    pub(crate) fn integrate_deletion(&mut self, deletion: &Deletion) -> Vec<Range<usize>> {
        let ranges = self.replica.integrate_deletion(deletion);

        // Apply deletions to rope in reverse order
        for range in ranges.iter().rev() {
            let bytes = self.byte_of(range.start)..self.byte_of(range.end);
            self.rope.delete(bytes);
        }

        ranges
    }

    /// Convert an index range into a position range that survives concurrent edits
    pub fn index_range_to_pos_range(&self, range: IndexRange) -> PosRange {
        let len = self.len();
        let from = range.from.min(len);
        let to = range.to.min(len).max(from);

        // A caret sticks to the character before it; a non-empty range hugs its own characters
        let from_bias = if from == to {
            AnchorBias::Left
        } else {
            AnchorBias::Right
        };

        PosRange {
            text: self.created,
            from: TextPos(self.replica.create_anchor(from, from_bias)),
            to: TextPos(self.replica.create_anchor(to, AnchorBias::Left)),
        }
    }

    /// Resolve a position range against the current state of this text.
    ///
    /// Ranges taken in another text, such as one replaced by a concurrent
    /// creation, do not resolve.
    pub fn pos_range_to_index_range(&self, range: &PosRange) -> Option<IndexRange> {
        if range.text != self.created {
            return None;
        }
        let from = self.replica.resolve_anchor(range.from.0.clone())?;
        let to = self.replica.resolve_anchor(range.to.0.clone())?;
        Some(IndexRange::new(from.min(to), from.max(to)))
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rope)
    }
}
