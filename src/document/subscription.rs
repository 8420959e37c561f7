use std::cell::RefCell;
use std::rc::Weak;

use super::DocState;

/// Handle returned by `Document::subscribe`.
///
/// `unsubscribe` may be called any number of times; only the first call
/// removes the callback. Dropping the handle unsubscribes as well.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    handle: Option<(Weak<RefCell<DocState>>, u64)>,
}

impl Subscription {
    pub(crate) fn new(state: Weak<RefCell<DocState>>, id: u64) -> Self {
        Self {
            handle: Some((state, id)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn unsubscribe(&mut self) {
        let Some((state, id)) = self.handle.take() else {
            return;
        };
        if let Some(state) = state.upgrade() {
            state.borrow_mut().remove_subscriber(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.handle.as_ref().map(|(_, id)| *id))
            .finish()
    }
}
