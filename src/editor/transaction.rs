use super::change::{ChangeSet, ChangeSpec};
use super::state::Selection;
use crate::core::SessionId;

/// Metadata attached to a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Produced by the sync bridge of this session from a remote change
    SyncOrigin(SessionId),
    /// Produced by a user action such as "input" or "delete"
    UserEvent(String),
}

/// How the change specs of a [`TransactionSpec`] relate to each other
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Changes {
    /// All relative to the starting document, non-overlapping
    Simultaneous(Vec<ChangeSpec>),
    /// Each relative to the document left by the previous one
    Sequential(Vec<ChangeSpec>),
}

impl Default for Changes {
    fn default() -> Self {
        Changes::Simultaneous(Vec::new())
    }
}

/// Description of a transaction to dispatch
#[derive(Debug, Clone, Default)]
pub struct TransactionSpec {
    pub changes: Changes,
    pub selection: Option<Selection>,
    pub annotations: Vec<Annotation>,
}

impl TransactionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(mut self, specs: Vec<ChangeSpec>) -> Self {
        self.changes = Changes::Simultaneous(specs);
        self
    }

    pub fn sequential(mut self, specs: Vec<ChangeSpec>) -> Self {
        self.changes = Changes::Sequential(specs);
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn user_event(self, event: impl Into<String>) -> Self {
        self.annotate(Annotation::UserEvent(event.into()))
    }

    pub(crate) fn change_set(&self, doc_len: usize) -> super::error::Result<ChangeSet> {
        match &self.changes {
            Changes::Simultaneous(specs) => ChangeSet::simultaneous(specs.iter().cloned(), doc_len),
            Changes::Sequential(specs) => ChangeSet::sequential(specs.iter().cloned(), doc_len),
        }
    }
}

/// A committed transaction
#[derive(Debug, Clone)]
pub struct Transaction {
    id: u64,
    changes: ChangeSet,
    annotations: Vec<Annotation>,
    selection: Option<Selection>,
}

impl Transaction {
    pub(crate) fn new(
        id: u64,
        changes: ChangeSet,
        annotations: Vec<Annotation>,
        selection: Option<Selection>,
    ) -> Self {
        Self {
            id,
            changes,
            annotations,
            selection,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn doc_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Explicit selection set by this transaction
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Session of the sync bridge that produced this transaction, if any
    pub fn sync_origin(&self) -> Option<SessionId> {
        self.annotations.iter().find_map(|annotation| match annotation {
            Annotation::SyncOrigin(session) => Some(*session),
            _ => None,
        })
    }

    pub fn user_event(&self) -> Option<&str> {
        self.annotations.iter().find_map(|annotation| match annotation {
            Annotation::UserEvent(event) => Some(event.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActorId;

    #[test]
    fn test_annotation_lookup() {
        let session = SessionId::from(ActorId(3));
        let tr = Transaction::new(
            1,
            ChangeSet::empty(),
            vec![
                Annotation::UserEvent("input".to_string()),
                Annotation::SyncOrigin(session),
            ],
            None,
        );

        assert_eq!(tr.sync_origin(), Some(session));
        assert_eq!(tr.user_event(), Some("input"));
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_spec_builds_change_set() {
        let spec = TransactionSpec::new().sequential(vec![
            ChangeSpec::insert(0, "A"),
            ChangeSpec::insert(1, "B"),
        ]);
        assert_eq!(spec.change_set(0).unwrap().len(), 2);

        // The same specs read simultaneously point past the empty document
        let spec = TransactionSpec::new().changes(vec![
            ChangeSpec::insert(0, "A"),
            ChangeSpec::insert(1, "B"),
        ]);
        assert!(spec.change_set(0).is_err());
    }
}
