use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one participant's replica of a shared document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl ActorId {
    /// Actor id reserved for the relay's own copy of a document.
    ///
    /// Actor ids double as CRDT replica ids, which must be non-zero.
    pub const RELAY: ActorId = ActorId(u64::MAX);

    /// Generate a random actor id, never zero and never [`ActorId::RELAY`]
    pub fn random() -> Self {
        Self(fastrand::u64(1..u64::MAX))
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Stable identity of a synchronization session.
///
/// Derived from the document's actor id, so rebuilding a configuration for
/// the same document yields the same session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(u64);

impl From<ActorId> for SessionId {
    fn from(actor: ActorId) -> Self {
        Self(actor.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{:016x}", self.0)
    }
}

/// Half-open range of UTF-16 code unit offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub from: usize,
    pub to: usize,
}

impl IndexRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn caret(at: usize) -> Self {
        Self { from: at, to: at }
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    /// Whether the range lies within `[0, len]`
    pub fn fits(&self, len: usize) -> bool {
        self.from <= self.to && self.to <= len
    }
}

/// Logical timestamp identifying one operation in a document's history.
///
/// Ordered by lamport clock first, then actor, then position within its change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeTicket {
    pub lamport: u64,
    pub actor: ActorId,
    pub delimiter: u32,
}

impl TimeTicket {
    pub fn new(lamport: u64, actor: ActorId, delimiter: u32) -> Self {
        Self {
            lamport,
            actor,
            delimiter,
        }
    }
}

/// Length of a string in UTF-16 code units
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}
