use std::cell::RefCell;
use std::rc::Weak;
use tracing::{debug, error, trace};

use crate::core::{Result, SessionId};
use crate::document::{DocEvent, Document, OperationInfo, Subscription, Topic, CONTENT_PATH};
use crate::editor::{
    Annotation, ChangeSet, ChangeSpec, EditorState, EditorView, PluginFactory, TransactionSpec,
    ViewPlugin, ViewUpdate,
};

/// Explicit configuration handed to the sync bridge
#[derive(Clone, Debug)]
pub struct SyncConfig {
    doc: Document,
    session: SessionId,
}

impl SyncConfig {
    /// Configuration whose session is derived from the document's actor,
    /// so rebuilding it for the same document keeps the same session
    pub fn new(doc: Document) -> Self {
        let session = SessionId::from(doc.actor());
        Self { doc, session }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn session(&self) -> SessionId {
        self.session
    }
}

/// Keeps an editor view and a shared document's `content` field in step.
///
/// Local transactions become document edits; remote document changes become
/// editor transactions annotated with [`Annotation::SyncOrigin`], which this
/// bridge then ignores on the way back.
pub struct EditorSyncBridge {
    config: SyncConfig,
    subscription: Subscription,
}

impl EditorSyncBridge {
    pub fn new(view: Weak<RefCell<EditorView>>, config: SyncConfig) -> Self {
        let session = config.session();
        let subscription = config
            .doc()
            .subscribe(Topic::path(CONTENT_PATH), move |event| {
                let Some(spec) = remote_transaction(event, session) else {
                    return;
                };
                let Some(view) = view.upgrade() else {
                    return;
                };
                let result = view.borrow_mut().dispatch(spec);
                if let Err(e) = result {
                    error!("Failed to apply remote change to editor: {}", e);
                }
            });
        debug!("Sync bridge attached for {}", session);

        Self {
            config,
            subscription,
        }
    }

    /// Replay local changes against the shared document in one atomic update
    fn publish(&self, changes: &ChangeSet) -> Result<()> {
        self.config.doc().update(|root, presence| {
            for change in changes {
                let mut content = root.content_or_create();
                let range = content.edit(change.from_a, change.to_a, &change.inserted)?;
                presence.set_selection(Some(content.index_range_to_pos_range(range)));
            }
            Ok(())
        })?;
        Ok(())
    }
}

impl ViewPlugin for EditorSyncBridge {
    fn update(&mut self, update: &ViewUpdate<'_>) -> Result<()> {
        if !update.doc_changed() {
            return Ok(());
        }
        let session = self.config.session();
        if update
            .transactions()
            .iter()
            .any(|tr| tr.sync_origin() == Some(session))
        {
            trace!("Skipping transaction synchronized from {}", session);
            return Ok(());
        }

        self.publish(update.changes())
    }

    fn destroy(&mut self) {
        self.subscription.unsubscribe();
        debug!("Sync bridge detached for {}", self.config.session());
    }
}

/// Translate a remote-change event into one editor transaction.
///
/// Only edit operations are kept; they are applied sequentially in event
/// order, with offsets clamped at zero.
pub fn remote_transaction(event: &DocEvent, session: SessionId) -> Option<TransactionSpec> {
    let DocEvent::RemoteChange { operations, .. } = event else {
        return None;
    };

    let changes: Vec<ChangeSpec> = operations
        .iter()
        .filter_map(|op| match op {
            OperationInfo::Edit { from, to, value, .. } => Some(ChangeSpec::replace(
                clamp(*from),
                clamp(*to),
                value.content.clone(),
            )),
            _ => None,
        })
        .collect();

    if changes.is_empty() {
        return None;
    }

    Some(
        TransactionSpec::new()
            .sequential(changes)
            .annotate(Annotation::SyncOrigin(session)),
    )
}

fn clamp(offset: i64) -> usize {
    offset.max(0) as usize
}

/// Plugin factory installing an [`EditorSyncBridge`]
pub struct YSync {
    config: SyncConfig,
}

impl YSync {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }
}

impl PluginFactory for YSync {
    fn create(&self, view: Weak<RefCell<EditorView>>, _state: &EditorState) -> Box<dyn ViewPlugin> {
        Box::new(EditorSyncBridge::new(view, self.config.clone()))
    }
}
