use cola::{Deletion, Insertion, Replica};

use super::presence::Presence;
use crate::core::{ActorId, TimeTicket};

/// Identifier of a change: the author and its lamport clock at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeId {
    pub lamport: u64,
    pub actor: ActorId,
}

impl ChangeId {
    /// Ticket for the `delimiter`-th operation of this change
    pub fn ticket(&self, delimiter: u32) -> TimeTicket {
        TimeTicket::new(self.lamport, self.actor, delimiter)
    }
}

/// Replicated operation on the document root
#[derive(Debug, Clone)]
pub enum CrdtOperation {
    /// `$.content` was (re)created; `replica` is the creator's empty replica
    CreateText {
        created: TimeTicket,
        replica: Replica,
    },
    /// Text inserted into the text created at `target`
    Insert {
        target: TimeTicket,
        insertion: Insertion,
        text: String,
    },
    /// Text deleted from the text created at `target`
    Delete {
        target: TimeTicket,
        deletion: Deletion,
    },
}

/// Atomic unit of replication produced by one `Document::update` call
#[derive(Debug, Clone)]
pub struct Change {
    pub id: ChangeId,
    pub operations: Vec<CrdtOperation>,
    /// The author's presence, when the change updated it
    pub presence: Option<Presence>,
}

impl Change {
    pub fn actor(&self) -> ActorId {
        self.id.actor
    }
}
