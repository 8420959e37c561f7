//! In-process stand-in for the document sync service.
//!
//! The relay keeps its own copy of the document, hands out forks of it to
//! attaching participants, and on [`Relay::sync`] moves every participant's
//! queued changes to all the others.

use tracing::{debug, info};

use crate::core::ActorId;
use crate::document::error::Result;
use crate::document::{Document, WeakDocument};

struct Participant {
    actor: ActorId,
    doc: WeakDocument,
}

pub struct Relay {
    server: Document,
    participants: Vec<Participant>,
}

impl Relay {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            server: Document::new(key, ActorId::RELAY),
            participants: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        self.server.key()
    }

    /// Relay-side copy of the document
    pub fn server(&self) -> &Document {
        &self.server
    }

    /// Attach a new participant, starting from the relay's current copy
    pub fn attach(&mut self) -> Document {
        let actor = loop {
            let candidate = ActorId::random();
            if !self.participants.iter().any(|p| p.actor == candidate) {
                break candidate;
            }
        };

        let doc = self.server.fork(actor);
        self.participants.push(Participant {
            actor,
            doc: doc.downgrade(),
        });
        info!("Attached {} to {}", actor, self.key());
        doc
    }

    /// Actors currently attached, in attach order
    pub fn participants(&self) -> Vec<ActorId> {
        self.live()
            .iter()
            .map(|doc| doc.actor())
            .collect()
    }

    /// Relay every queued change; returns how many were relayed
    pub fn sync(&mut self) -> Result<usize> {
        self.prune();
        let docs = self.live();

        let mut relayed = 0;
        for doc in &docs {
            relayed += self.push(doc, &docs)?;
        }
        if relayed > 0 {
            debug!("Relayed {} change(s) on {}", relayed, self.key());
        }
        Ok(relayed)
    }

    /// Flush `doc`'s queued changes, then detach it and drop its presence
    pub fn detach(&mut self, doc: &Document) -> Result<()> {
        self.prune();
        let actor = doc.actor();
        let docs = self.live();
        if doc.is_attached() {
            self.push(doc, &docs)?;
        }

        doc.detach();
        self.participants.retain(|p| p.actor != actor);
        self.server.remove_presence(actor);
        for other in docs.iter().filter(|other| other.actor() != actor) {
            other.remove_presence(actor);
        }
        info!("Detached {} from {}", actor, self.key());
        Ok(())
    }

    fn push(&self, doc: &Document, docs: &[Document]) -> Result<usize> {
        let changes = doc.take_pending();
        for change in &changes {
            self.server.apply_change(change)?;
            for other in docs.iter().filter(|other| other.actor() != doc.actor()) {
                other.apply_change(change)?;
            }
        }
        Ok(changes.len())
    }

    fn live(&self) -> Vec<Document> {
        self.participants
            .iter()
            .filter_map(|p| p.doc.upgrade())
            .filter(|doc| doc.is_attached())
            .collect()
    }

    fn prune(&mut self) {
        self.participants
            .retain(|p| p.doc.upgrade().is_some_and(|doc| doc.is_attached()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IndexRange;
    use crate::document::{DocEvent, Topic};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn insert(doc: &Document, at: usize, text: &str) {
        doc.update(|root, presence| {
            let mut content = root.content_or_create();
            let range = content.edit(at, at, text)?;
            presence.set_selection(Some(content.index_range_to_pos_range(range)));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_sync_converges_participants() {
        let mut relay = Relay::new("notes");
        let alice = relay.attach();
        let bob = relay.attach();

        insert(&alice, 0, "hello");
        assert_eq!(relay.sync().unwrap(), 1);
        assert_eq!(bob.content_text().as_deref(), Some("hello"));

        insert(&alice, 0, ">");
        insert(&bob, 5, "!");
        assert_eq!(relay.sync().unwrap(), 2);

        assert_eq!(alice.content_text(), bob.content_text());
        assert_eq!(relay.server().content_text().as_deref(), Some(">hello!"));
    }

    #[test]
    fn test_late_joiner_starts_from_relay_copy() {
        let mut relay = Relay::new("notes");
        let alice = relay.attach();
        insert(&alice, 0, "draft");
        relay.sync().unwrap();

        let carol = relay.attach();
        assert_eq!(carol.content_text().as_deref(), Some("draft"));
        assert_eq!(
            carol.resolve_selection(alice.actor()),
            Some(IndexRange::caret(5))
        );

        insert(&carol, 5, "!");
        relay.sync().unwrap();
        assert_eq!(alice.content_text().as_deref(), Some("draft!"));
    }

    #[test]
    fn test_detach_flushes_and_removes_presence() {
        let mut relay = Relay::new("notes");
        let alice = relay.attach();
        let bob = relay.attach();

        let removed = Rc::new(RefCell::new(Vec::new()));
        let sink = removed.clone();
        let _sub = bob.subscribe(Topic::Presence, move |event| {
            if let DocEvent::PresenceChanged {
                actor,
                presence: None,
            } = event
            {
                sink.borrow_mut().push(*actor);
            }
        });

        insert(&alice, 0, "bye");
        relay.detach(&alice).unwrap();

        assert_eq!(bob.content_text().as_deref(), Some("bye"));
        assert_eq!(*removed.borrow(), vec![alice.actor()]);
        assert!(bob.presence(alice.actor()).is_none());
        assert_eq!(relay.participants(), vec![bob.actor()]);
        assert!(!alice.is_attached());
    }

    #[test]
    fn test_dropped_documents_are_pruned() {
        let mut relay = Relay::new("notes");
        let alice = relay.attach();
        {
            let _bob = relay.attach();
        }
        insert(&alice, 0, "x");
        assert_eq!(relay.sync().unwrap(), 1);
        assert_eq!(relay.participants(), vec![alice.actor()]);
    }

    #[test]
    fn test_first_edit_reaches_server_copy() {
        let mut relay = Relay::new("notes");
        let alice = relay.attach();

        insert(&alice, 0, "first");
        assert_eq!(relay.sync().unwrap(), 1);
        assert_eq!(relay.server().content_text().as_deref(), Some("first"));

        insert(&alice, 5, "!");
        relay.sync().unwrap();
        assert_eq!(relay.server().content_text().as_deref(), Some("first!"));
    }

    #[test]
    fn test_concurrent_creation_settles_on_server() {
        let mut relay = Relay::new("notes");
        let alice = relay.attach();
        let bob = relay.attach();

        insert(&alice, 0, "from alice");
        insert(&bob, 0, "from bob");
        assert_eq!(relay.sync().unwrap(), 2);

        let winner = alice.content_text();
        assert!(winner.is_some());
        assert_eq!(bob.content_text(), winner);
        assert_eq!(relay.server().content_text(), winner);
    }
}

