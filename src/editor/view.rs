use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{trace, warn};

use super::change::ChangeSet;
use super::state::EditorState;
use super::transaction::{Transaction, TransactionSpec};
use crate::core::Result;

/// Shared handle to a mounted editor view
pub type ViewHandle = Rc<RefCell<EditorView>>;

/// What a plugin sees after a dispatch
pub struct ViewUpdate<'a> {
    transactions: &'a [Transaction],
    changes: ChangeSet,
    start_len: usize,
    state: &'a EditorState,
}

impl<'a> ViewUpdate<'a> {
    pub fn transactions(&self) -> &'a [Transaction] {
        self.transactions
    }

    /// Changes of all transactions, in order
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn doc_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Document length before the transactions
    pub fn start_len(&self) -> usize {
        self.start_len
    }

    /// State after the transactions
    pub fn state(&self) -> &'a EditorState {
        self.state
    }
}

/// Extension living inside an [`EditorView`]
pub trait ViewPlugin {
    /// Called after every dispatched transaction has been committed to the state
    fn update(&mut self, update: &ViewUpdate<'_>) -> Result<()>;

    /// Called once when the view is destroyed
    fn destroy(&mut self) {}
}

/// Creates a plugin when a view is mounted
pub trait PluginFactory {
    fn create(&self, view: Weak<RefCell<EditorView>>, state: &EditorState) -> Box<dyn ViewPlugin>;
}

/// Local editing surface: a state plus the plugins observing it
pub struct EditorView {
    state: EditorState,
    plugins: Vec<Box<dyn ViewPlugin>>,
    next_transaction: u64,
    destroyed: bool,
}

impl EditorView {
    /// A view without plugins
    pub fn new(state: EditorState) -> Self {
        Self {
            state,
            plugins: Vec::new(),
            next_transaction: 1,
            destroyed: false,
        }
    }

    /// Mount a view and create its plugins
    pub fn mount(state: EditorState, factories: &[Box<dyn PluginFactory>]) -> ViewHandle {
        let view = Rc::new(RefCell::new(Self::new(state)));
        let plugins: Vec<Box<dyn ViewPlugin>> = {
            let current = view.borrow();
            factories
                .iter()
                .map(|factory| factory.create(Rc::downgrade(&view), &current.state))
                .collect()
        };
        view.borrow_mut().plugins = plugins;
        view
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn text(&self) -> String {
        self.state.text()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Commit a transaction and notify every plugin.
    ///
    /// The state keeps the change even when a plugin fails; the first plugin
    /// error is returned after all plugins have run.
    pub fn dispatch(&mut self, spec: TransactionSpec) -> Result<()> {
        let start_len = self.state.len();
        let changes = spec.change_set(start_len)?;

        let transaction = Transaction::new(self.next_transaction, changes, spec.annotations, spec.selection);
        self.next_transaction += 1;
        self.state.apply(&transaction);
        trace!(
            "Committed transaction {} with {} change(s)",
            transaction.id(),
            transaction.changes().len()
        );

        let update = ViewUpdate {
            transactions: std::slice::from_ref(&transaction),
            changes: transaction.changes().clone(),
            start_len,
            state: &self.state,
        };

        let mut first_error = None;
        for plugin in &mut self.plugins {
            if let Err(e) = plugin.update(&update) {
                warn!("Plugin failed to handle transaction {}: {}", transaction.id(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Destroy every plugin; later calls do nothing
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for plugin in &mut self.plugins {
            plugin.destroy();
        }
        self.plugins.clear();
    }
}

impl Drop for EditorView {
    fn drop(&mut self) {
        self.destroy();
    }
}
