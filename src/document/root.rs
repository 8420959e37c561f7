use std::ops::Deref;
use tracing::debug;

use super::change::{ChangeId, CrdtOperation};
use super::error::{DocumentError, Result};
use super::event::{OperationInfo, ROOT_PATH};
use super::text::{PosRange, Text};
use crate::core::{utf16_len, ActorId, IndexRange, TimeTicket};

/// Document root: the optional `content` text field
#[derive(Debug, Clone, Default)]
pub(crate) struct Root {
    pub(crate) content: Option<Text>,
}

impl Root {
    /// Fork the root for another actor
    pub(crate) fn fork(&self, actor: ActorId) -> Self {
        Self {
            content: self.content.as_ref().map(|text| text.fork(actor)),
        }
    }

    /// Integrate one remote operation, recording what changed
    pub(crate) fn integrate(
        &mut self,
        operation: &CrdtOperation,
        actor: ActorId,
        infos: &mut Vec<OperationInfo>,
    ) {
        match operation {
            CrdtOperation::CreateText { created, replica } => {
                let replaced_len = match &self.content {
                    Some(existing) if existing.created() >= *created => {
                        debug!("Ignoring text creation {:?} superseded by {:?}", created, existing.created());
                        return;
                    }
                    Some(existing) => existing.len(),
                    None => 0,
                };

                self.content = Some(Text::join(*created, replica, actor));
                infos.push(OperationInfo::Set {
                    path: ROOT_PATH.to_string(),
                    key: "content".to_string(),
                });
                if replaced_len > 0 {
                    infos.push(OperationInfo::edit(0, replaced_len, ""));
                }
            }
            CrdtOperation::Insert {
                target,
                insertion,
                text,
            } => {
                let Some(content) = self.live_text(*target) else {
                    return;
                };
                match content.integrate_insertion(insertion, text) {
                    Some(offset) => infos.push(OperationInfo::edit(offset, offset, text.clone())),
                    None => debug!("Insertion into {:?} was not integrated", target),
                }
            }
            CrdtOperation::Delete { target, deletion } => {
                let Some(content) = self.live_text(*target) else {
                    return;
                };
                let ranges = content.integrate_deletion(deletion);
                // Descending, so every edit stays valid after the previous one
                for range in ranges.iter().rev() {
                    infos.push(OperationInfo::edit(range.start, range.end, ""));
                }
            }
        }
    }

    fn live_text(&mut self, target: TimeTicket) -> Option<&mut Text> {
        match self.content.as_mut() {
            Some(content) if content.created() == target => Some(content),
            _ => {
                debug!("Dropping operation aimed at superseded text {:?}", target);
                None
            }
        }
    }
}

/// Mutable handle to the document root inside `Document::update`
pub struct RootMut<'a> {
    root: &'a mut Root,
    recorder: Recorder<'a>,
}

/// Collects the operations and local event payloads of one change
pub(crate) struct Recorder<'a> {
    pub(crate) change: ChangeId,
    pub(crate) operations: &'a mut Vec<CrdtOperation>,
    pub(crate) infos: &'a mut Vec<OperationInfo>,
}

impl Recorder<'_> {
    /// Create an empty text field and record its creation
    fn create_text(&mut self) -> Text {
        let created = self.change.ticket(self.operations.len() as u32);
        let text = Text::new(created);
        self.operations.push(CrdtOperation::CreateText {
            created,
            replica: text.replica().clone(),
        });
        self.infos.push(OperationInfo::Set {
            path: ROOT_PATH.to_string(),
            key: "content".to_string(),
        });
        text
    }
}

impl<'a> RootMut<'a> {
    pub(crate) fn new(root: &'a mut Root, recorder: Recorder<'a>) -> Self {
        Self { root, recorder }
    }

    /// The `content` text field, if it exists
    pub fn content(&mut self) -> Option<TextMut<'_, 'a>> {
        let Self { root, recorder } = self;
        root.content
            .as_mut()
            .map(move |text| TextMut { text, recorder })
    }

    /// The `content` text field, created empty if absent
    pub fn content_or_create(&mut self) -> TextMut<'_, 'a> {
        let Self { root, recorder } = self;
        let text = root.content.get_or_insert_with(|| recorder.create_text());
        TextMut { text, recorder }
    }
}

/// Mutable handle to the `content` text field
pub struct TextMut<'r, 'a> {
    text: &'r mut Text,
    recorder: &'r mut Recorder<'a>,
}

impl TextMut<'_, '_> {
    /// Replace `from..to` with `content`.
    ///
    /// Returns the caret range just after the inserted text.
    pub fn edit(&mut self, from: usize, to: usize, content: &str) -> Result<IndexRange> {
        let len = self.text.len();
        if from > to || to > len {
            return Err(DocumentError::InvalidRange { from, to, len });
        }

        let target = self.text.created();
        if from < to {
            let deletion = self.text.delete_local(from, to);
            self.recorder
                .operations
                .push(CrdtOperation::Delete { target, deletion });
        }
        if !content.is_empty() {
            let insertion = self.text.insert_local(from, content);
            self.recorder.operations.push(CrdtOperation::Insert {
                target,
                insertion,
                text: content.to_string(),
            });
        }
        if from < to || !content.is_empty() {
            self.recorder
                .infos
                .push(OperationInfo::edit(from, to, content));
        }

        Ok(IndexRange::caret(from + utf16_len(content)))
    }

    pub fn index_range_to_pos_range(&self, range: IndexRange) -> PosRange {
        self.text.index_range_to_pos_range(range)
    }
}

impl Deref for TextMut<'_, '_> {
    type Target = Text;

    fn deref(&self) -> &Text {
        self.text
    }
}
