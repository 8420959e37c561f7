use super::text::PosRange;

/// Ephemeral per-participant state broadcast with document changes
#[derive(Debug, Clone, Default)]
pub struct Presence {
    pub selection: Option<PosRange>,
}

/// Mutable handle to the local participant's presence inside `Document::update`
pub struct PresenceMut<'a> {
    presence: &'a mut Presence,
    changed: bool,
}

impl<'a> PresenceMut<'a> {
    pub(crate) fn new(presence: &'a mut Presence) -> Self {
        Self {
            presence,
            changed: false,
        }
    }

    pub fn get(&self) -> &Presence {
        self.presence
    }

    /// Replace the whole presence record
    pub fn set(&mut self, presence: Presence) {
        *self.presence = presence;
        self.changed = true;
    }

    pub fn set_selection(&mut self, selection: Option<PosRange>) {
        self.presence.selection = selection;
        self.changed = true;
    }

    pub(crate) fn changed(&self) -> bool {
        self.changed
    }
}
