use crop::Rope;
use std::collections::VecDeque;

use super::change::{Assoc, ChangeSet};
use super::transaction::Transaction;

/// Maximum number of transactions to keep in the log
pub const MAX_HISTORY_SIZE: usize = 100;

/// Selection as an anchor and a head offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn cursor(at: usize) -> Self {
        Self::new(at, at)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    fn map(&self, changes: &ChangeSet) -> Self {
        Self {
            anchor: changes.map_pos(self.anchor, Assoc::After),
            head: changes.map_pos(self.head, Assoc::After),
        }
    }

    fn clamp(&self, len: usize) -> Self {
        Self::new(self.anchor.min(len), self.head.min(len))
    }
}

/// State of the local editing surface.
///
/// Offsets are UTF-16 code units.
#[derive(Debug, Clone)]
pub struct EditorState {
    doc: Rope,
    selection: Selection,
    /// Most recent committed transactions, oldest first
    history: VecDeque<Transaction>,
}

impl EditorState {
    pub fn new(text: &str) -> Self {
        Self {
            doc: Rope::from(text),
            selection: Selection::default(),
            history: VecDeque::new(),
        }
    }

    pub fn text(&self) -> String {
        self.doc.to_string()
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.doc.utf16_len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.byte_len() == 0
    }

    pub fn slice(&self, from: usize, to: usize) -> String {
        let start = self.byte_of(from);
        let end = self.byte_of(to);
        self.doc.byte_slice(start..end).to_string()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn history(&self) -> &VecDeque<Transaction> {
        &self.history
    }

    fn byte_of(&self, offset: usize) -> usize {
        self.doc.byte_of_utf16_code_unit(offset.min(self.len()))
    }

    /// Apply a transaction whose change-set was validated against this state
    pub(crate) fn apply(&mut self, transaction: &Transaction) {
        for step in transaction.changes() {
            let range = self.byte_of(step.from_a)..self.byte_of(step.to_a);
            self.doc.replace(range, &step.inserted);
        }

        self.selection = match transaction.selection() {
            Some(selection) => selection.clamp(self.len()),
            None => self.selection.map(transaction.changes()),
        };

        self.history.push_back(transaction.clone());

        // Limit history size
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}
