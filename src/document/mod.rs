//! Shared CRDT document: one `content` text field plus per-participant presence.
//!
//! Local mutations go through [`Document::update`], remote ones through
//! [`Document::apply_change`]. Both notify subscribers synchronously, after the
//! document's internal borrow has been released.

pub mod change;
pub mod error;
pub mod event;
pub mod presence;
mod root;
pub mod subscription;
pub mod text;

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

pub use change::{Change, ChangeId, CrdtOperation};
pub use error::DocumentError;
pub use event::{DocEvent, EditValue, OperationInfo, Topic, CONTENT_PATH, ROOT_PATH};
pub use presence::{Presence, PresenceMut};
pub use root::{RootMut, TextMut};
pub use subscription::Subscription;
pub use text::{PosRange, Text, TextPos};

use crate::core::{ActorId, IndexRange};
use error::Result;
use root::{Recorder, Root};

/// Whether the document still takes part in its sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStatus {
    Attached,
    Detached,
}

type Callback = Rc<dyn Fn(&DocEvent)>;

struct Subscriber {
    id: u64,
    topic: Topic,
    callback: Callback,
}

pub(crate) struct DocState {
    key: String,
    actor: ActorId,
    status: DocStatus,
    root: Root,
    presences: FxHashMap<ActorId, Presence>,
    lamport: u64,
    /// Local changes not yet picked up by the relay
    pending: Vec<Change>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
}

impl DocState {
    pub(crate) fn remove_subscriber(&mut self, id: u64) {
        self.subscribers.retain(|s| s.id != id);
    }

    fn has_subscriber(&self, id: u64) -> bool {
        self.subscribers.iter().any(|s| s.id == id)
    }

    fn detached_error(&self) -> DocumentError {
        DocumentError::Detached {
            key: self.key.clone(),
        }
    }
}

/// Handle to a shared document. Clones refer to the same document.
#[derive(Clone)]
pub struct Document {
    state: Rc<RefCell<DocState>>,
}

/// Non-owning handle to a shared document
#[derive(Clone)]
pub struct WeakDocument {
    state: Weak<RefCell<DocState>>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.state.upgrade().map(|state| Document { state })
    }
}

impl Document {
    /// Create an empty document for the given actor
    pub fn new(key: impl Into<String>, actor: ActorId) -> Self {
        Self::from_parts(key.into(), actor, Root::default(), FxHashMap::default(), 0)
    }

    fn from_parts(
        key: String,
        actor: ActorId,
        root: Root,
        presences: FxHashMap<ActorId, Presence>,
        lamport: u64,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(DocState {
                key,
                actor,
                status: DocStatus::Attached,
                root,
                presences,
                lamport,
                pending: Vec::new(),
                subscribers: Vec::new(),
                next_subscriber: 0,
            })),
        }
    }

    /// Copy this document's current state for another actor
    pub(crate) fn fork(&self, actor: ActorId) -> Self {
        let state = self.state.borrow();
        Self::from_parts(
            state.key.clone(),
            actor,
            state.root.fork(actor),
            state.presences.clone(),
            state.lamport,
        )
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            state: Rc::downgrade(&self.state),
        }
    }

    pub fn key(&self) -> String {
        self.state.borrow().key.clone()
    }

    pub fn actor(&self) -> ActorId {
        self.state.borrow().actor
    }

    pub fn status(&self) -> DocStatus {
        self.state.borrow().status
    }

    pub fn is_attached(&self) -> bool {
        self.status() == DocStatus::Attached
    }

    /// Current lamport clock
    pub fn lamport(&self) -> u64 {
        self.state.borrow().lamport
    }

    /// Text of the `content` field, `None` while it does not exist
    pub fn content_text(&self) -> Option<String> {
        self.with_content(|text| text.to_string())
    }

    /// Run `f` against the `content` field, if it exists
    pub fn with_content<R>(&self, f: impl FnOnce(&Text) -> R) -> Option<R> {
        self.state.borrow().root.content.as_ref().map(f)
    }

    pub fn presence(&self, actor: ActorId) -> Option<Presence> {
        self.state.borrow().presences.get(&actor).cloned()
    }

    /// Presence records of every known participant, sorted by actor
    pub fn presences(&self) -> Vec<(ActorId, Presence)> {
        let mut presences: Vec<_> = self
            .state
            .borrow()
            .presences
            .iter()
            .map(|(actor, presence)| (*actor, presence.clone()))
            .collect();
        presences.sort_by_key(|(actor, _)| *actor);
        presences
    }

    /// Resolve a participant's selection against the current content
    pub fn resolve_selection(&self, actor: ActorId) -> Option<IndexRange> {
        let state = self.state.borrow();
        let selection = state.presences.get(&actor)?.selection.as_ref()?;
        state.root.content.as_ref()?.pos_range_to_index_range(selection)
    }

    /// Mutate the document atomically.
    ///
    /// `f` works on a draft of the root and on the local presence; nothing is
    /// kept unless it returns `Ok`. `f` must not call back into this document.
    ///
    /// The draft is a full copy of the root, so each update is linear in the
    /// size of the text's CRDT history.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut RootMut<'_>, &mut PresenceMut<'_>) -> Result<()>,
    {
        let event = {
            let mut state = self.state.borrow_mut();
            if state.status == DocStatus::Detached {
                return Err(state.detached_error());
            }

            let actor = state.actor;
            let id = ChangeId {
                lamport: state.lamport + 1,
                actor,
            };

            let mut draft = state.root.clone();
            let mut presence = state.presences.get(&actor).cloned().unwrap_or_default();
            let mut operations = Vec::new();
            let mut infos = Vec::new();

            let presence_changed = {
                let recorder = Recorder {
                    change: id,
                    operations: &mut operations,
                    infos: &mut infos,
                };
                let mut root = RootMut::new(&mut draft, recorder);
                let mut presence = PresenceMut::new(&mut presence);
                f(&mut root, &mut presence)?;
                presence.changed()
            };

            if operations.is_empty() && !presence_changed {
                trace!("Update of {} recorded nothing", state.key);
                return Ok(());
            }

            state.lamport = id.lamport;
            state.root = draft;
            if presence_changed {
                state.presences.insert(actor, presence.clone());
            }
            debug!(
                "Committed change {} of {} with {} operation(s)",
                id.lamport,
                actor,
                operations.len()
            );
            state.pending.push(Change {
                id,
                operations,
                presence: presence_changed.then_some(presence),
            });

            DocEvent::LocalChange {
                actor,
                operations: infos,
            }
        };

        if !event.operations().is_empty() {
            self.emit(&event);
        }
        Ok(())
    }

    /// Integrate a change made by another participant.
    ///
    /// Changes authored by this document's own actor are echoes and ignored.
    pub fn apply_change(&self, change: &Change) -> Result<()> {
        let events = {
            let mut state = self.state.borrow_mut();
            if state.status == DocStatus::Detached {
                return Err(state.detached_error());
            }
            if change.actor() == state.actor {
                trace!("Ignoring echo of own change {}", change.id.lamport);
                return Ok(());
            }

            state.lamport = state.lamport.max(change.id.lamport);

            let actor = state.actor;
            let mut infos = Vec::new();
            for operation in &change.operations {
                state.root.integrate(operation, actor, &mut infos);
            }

            let mut events = Vec::new();
            if !infos.is_empty() {
                events.push(DocEvent::RemoteChange {
                    actor: change.actor(),
                    operations: infos,
                });
            }
            if let Some(presence) = &change.presence {
                state.presences.insert(change.actor(), presence.clone());
                events.push(DocEvent::PresenceChanged {
                    actor: change.actor(),
                    presence: Some(presence.clone()),
                });
            }
            events
        };

        for event in &events {
            self.emit(event);
        }
        Ok(())
    }

    /// Forget a participant's presence, notifying presence subscribers
    pub(crate) fn remove_presence(&self, actor: ActorId) {
        let removed = self.state.borrow_mut().presences.remove(&actor).is_some();
        if removed {
            self.emit(&DocEvent::PresenceChanged {
                actor,
                presence: None,
            });
        }
    }

    /// Drain the local changes waiting to be relayed
    pub fn take_pending(&self) -> Vec<Change> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.state.borrow().pending.is_empty()
    }

    /// Leave the sync session; later updates fail with `Detached`
    pub fn detach(&self) {
        let mut state = self.state.borrow_mut();
        if state.status == DocStatus::Attached {
            debug!("Detaching {} from {}", state.actor, state.key);
            state.status = DocStatus::Detached;
        }
    }

    /// Register `callback` for events matching `topic`
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&DocEvent) + 'static,
    {
        let mut state = self.state.borrow_mut();
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.push(Subscriber {
            id,
            topic,
            callback: Rc::new(callback),
        });
        Subscription::new(Rc::downgrade(&self.state), id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    fn emit(&self, event: &DocEvent) {
        let subscribers: Vec<(u64, Topic, Callback)> = self
            .state
            .borrow()
            .subscribers
            .iter()
            .map(|s| (s.id, s.topic.clone(), s.callback.clone()))
            .collect();

        for (id, topic, callback) in subscribers {
            // An earlier callback may have unsubscribed this one
            if !self.state.borrow().has_subscriber(id) {
                continue;
            }
            if let Some(event) = topic.filter(event) {
                callback(&event);
            }
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Document")
            .field("key", &state.key)
            .field("actor", &state.actor)
            .field("status", &state.status)
            .field("lamport", &state.lamport)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn pair() -> (Document, Document) {
        let relay = Document::new("doc", ActorId::RELAY);
        (relay.fork(ActorId(1)), relay.fork(ActorId(2)))
    }

    fn insert(doc: &Document, at: usize, text: &str) {
        doc.update(|root, _| {
            root.content_or_create().edit(at, at, text)?;
            Ok(())
        })
        .unwrap();
    }

    fn relay(from: &Document, to: &Document) {
        for change in from.take_pending() {
            to.apply_change(&change).unwrap();
        }
    }

    #[test]
    fn test_lazy_content_creation() {
        let (doc, _) = pair();
        assert_eq!(doc.content_text(), None);

        insert(&doc, 0, "hello");
        assert_eq!(doc.content_text().as_deref(), Some("hello"));

        let pending = doc.take_pending();
        assert_eq!(pending.len(), 1);
        assert!(matches!(
            pending[0].operations[0],
            CrdtOperation::CreateText { .. }
        ));
    }

    #[test]
    fn test_failed_update_keeps_nothing() {
        let (doc, _) = pair();
        insert(&doc, 0, "abc");
        doc.take_pending();

        let result = doc.update(|root, presence| {
            let mut content = root.content_or_create();
            content.edit(0, 0, "zzz")?;
            presence.set_selection(None);
            content.edit(10, 12, "")?;
            Ok(())
        });

        assert_eq!(
            result,
            Err(DocumentError::InvalidRange {
                from: 10,
                to: 12,
                len: 6
            })
        );
        assert_eq!(doc.content_text().as_deref(), Some("abc"));
        assert!(!doc.has_pending());
        assert!(doc.presence(doc.actor()).is_none());
    }

    #[test]
    fn test_detached_document_rejects_updates() {
        let (doc, _) = pair();
        doc.detach();
        let result = doc.update(|root, _| {
            root.content_or_create().edit(0, 0, "x")?;
            Ok(())
        });
        assert_eq!(
            result,
            Err(DocumentError::Detached {
                key: "doc".to_string()
            })
        );
    }

    #[test]
    fn test_changes_converge() {
        let (alice, bob) = pair();
        insert(&alice, 0, "Hello world");
        relay(&alice, &bob);
        assert_eq!(bob.content_text().as_deref(), Some("Hello world"));

        insert(&alice, 5, ",");
        insert(&bob, 11, "!");
        relay(&alice, &bob);
        relay(&bob, &alice);

        assert_eq!(alice.content_text().as_deref(), Some("Hello, world!"));
        assert_eq!(bob.content_text().as_deref(), Some("Hello, world!"));
    }

    #[test]
    fn test_own_change_echo_is_ignored() {
        let (alice, _) = pair();
        insert(&alice, 0, "abX");
        let changes = alice.take_pending();

        let events = Rc::new(RefCell::new(0));
        let counter = events.clone();
        let _sub = alice.subscribe(Topic::All, move |_| *counter.borrow_mut() += 1);

        for change in &changes {
            alice.apply_change(change).unwrap();
        }
        assert_eq!(alice.content_text().as_deref(), Some("abX"));
        assert_eq!(*events.borrow(), 0);
    }

    #[test]
    fn test_remote_deletion_events_are_sequential() {
        let (alice, bob) = pair();
        insert(&alice, 0, "abcdef");
        relay(&alice, &bob);

        // bob inserts inside the range alice deletes, so alice's deletion splits in two
        insert(&bob, 3, "XY");
        alice
            .update(|root, _| {
                root.content_or_create().edit(1, 5, "")?;
                Ok(())
            })
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bob.subscribe(Topic::path(CONTENT_PATH), move |event| {
            sink.borrow_mut().extend(event.operations().to_vec());
        });
        relay(&alice, &bob);

        assert_eq!(bob.content_text().as_deref(), Some("aXYf"));
        assert_eq!(
            *seen.borrow(),
            vec![OperationInfo::edit(5, 7, ""), OperationInfo::edit(1, 3, "")]
        );
    }

    #[test]
    fn test_concurrent_creation_has_one_winner() {
        let (alice, bob) = pair();
        insert(&alice, 0, "from alice");
        insert(&bob, 0, "from bob");

        relay(&alice, &bob);
        relay(&bob, &alice);

        // Same lamport clock, so the higher actor id wins
        assert_eq!(alice.content_text().as_deref(), Some("from bob"));
        assert_eq!(bob.content_text().as_deref(), Some("from bob"));
    }

    #[test]
    fn test_replaced_text_is_cleared_for_subscribers() {
        let (alice, bob) = pair();
        insert(&alice, 0, "old");
        insert(&bob, 0, "new");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = alice.subscribe(Topic::path(CONTENT_PATH), move |event| {
            sink.borrow_mut().extend(event.operations().to_vec());
        });
        relay(&bob, &alice);

        assert_eq!(
            *seen.borrow(),
            vec![OperationInfo::edit(0, 3, ""), OperationInfo::edit(0, 0, "new")]
        );
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let (doc, _) = pair();
        let mut sub = doc.subscribe(Topic::All, |_| {});
        let _other = doc.subscribe(Topic::All, |_| {});
        assert_eq!(doc.subscriber_count(), 2);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(doc.subscriber_count(), 1);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let (doc, _) = pair();
        {
            let _sub = doc.subscribe(Topic::Presence, |_| {});
            assert_eq!(doc.subscriber_count(), 1);
        }
        assert_eq!(doc.subscriber_count(), 0);
    }

    #[test]
    fn test_presence_travels_with_change() {
        let (alice, bob) = pair();
        alice
            .update(|root, presence| {
                let mut content = root.content_or_create();
                let range = content.edit(0, 0, "hello")?;
                presence.set_selection(Some(content.index_range_to_pos_range(range)));
                Ok(())
            })
            .unwrap();
        relay(&alice, &bob);

        assert_eq!(
            bob.resolve_selection(alice.actor()),
            Some(IndexRange::caret(5))
        );
    }
}
