use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::trace;

use crate::core::{ActorId, IndexRange, Result};
use crate::document::{DocEvent, Document, PosRange, Subscription, Topic};
use crate::editor::{EditorState, EditorView, PluginFactory, ViewPlugin, ViewUpdate};

/// Another participant's selection, resolved against the current text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoteSelection {
    pub actor: ActorId,
    pub range: IndexRange,
}

/// Latest known selection of every other participant
#[derive(Clone, Default)]
pub struct SelectionTracker {
    selections: Rc<RefCell<FxHashMap<ActorId, PosRange>>>,
}

impl SelectionTracker {
    pub fn len(&self) -> usize {
        self.selections.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.borrow().is_empty()
    }

    /// Resolve every tracked selection, sorted by actor.
    ///
    /// Selections that cannot be resolved against `doc` are skipped.
    pub fn decorations(&self, doc: &Document) -> Vec<RemoteSelection> {
        let selections = self.selections.borrow();
        let mut resolved: Vec<RemoteSelection> = doc
            .with_content(|text| {
                selections
                    .iter()
                    .filter_map(|(actor, selection)| {
                        let range = text.pos_range_to_index_range(selection)?;
                        Some(RemoteSelection {
                            actor: *actor,
                            range,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        resolved.sort_by_key(|selection| selection.actor);
        resolved
    }

    fn set(&self, actor: ActorId, selection: Option<PosRange>) {
        let mut selections = self.selections.borrow_mut();
        match selection {
            Some(selection) => {
                selections.insert(actor, selection);
            }
            None => {
                selections.remove(&actor);
            }
        }
    }

    fn clear(&self) {
        self.selections.borrow_mut().clear();
    }
}

/// Plugin keeping a [`SelectionTracker`] up to date from presence events
pub struct RemoteSelectionsPlugin {
    tracker: SelectionTracker,
    subscription: Subscription,
}

impl ViewPlugin for RemoteSelectionsPlugin {
    fn update(&mut self, _update: &ViewUpdate<'_>) -> Result<()> {
        // Selections are position ranges, so edits need no remapping here
        Ok(())
    }

    fn destroy(&mut self) {
        self.subscription.unsubscribe();
        self.tracker.clear();
    }
}

/// Plugin factory for [`RemoteSelectionsPlugin`]
pub struct RemoteSelections {
    doc: Document,
    tracker: SelectionTracker,
}

impl RemoteSelections {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            tracker: SelectionTracker::default(),
        }
    }

    /// Tracker shared with the plugins this factory creates
    pub fn tracker(&self) -> SelectionTracker {
        self.tracker.clone()
    }
}

impl PluginFactory for RemoteSelections {
    fn create(&self, _view: Weak<RefCell<EditorView>>, _state: &EditorState) -> Box<dyn ViewPlugin> {
        let own = self.doc.actor();
        for (actor, presence) in self.doc.presences() {
            if actor != own {
                self.tracker.set(actor, presence.selection);
            }
        }

        let tracker = self.tracker.clone();
        let subscription = self.doc.subscribe(Topic::Presence, move |event| {
            if let DocEvent::PresenceChanged { actor, presence } = event {
                if *actor == own {
                    return;
                }
                trace!("Presence of {} changed", actor);
                tracker.set(*actor, presence.as_ref().and_then(|p| p.selection.clone()));
            }
        });

        Box::new(RemoteSelectionsPlugin {
            tracker: self.tracker.clone(),
            subscription,
        })
    }
}
