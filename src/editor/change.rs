use serde::{Deserialize, Serialize};

use super::error::{EditorError, Result};
use crate::core::utf16_len;

/// A requested replacement of `from..to` by `insert`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSpec {
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub insert: String,
}

impl ChangeSpec {
    pub fn replace(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: insert.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self::replace(from, to, String::new())
    }
}

/// One step of a [`ChangeSet`].
///
/// `from_a..to_a` is the replaced range in the document before this step,
/// `from_b..to_b` the inserted range in the document after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedRange {
    pub from_a: usize,
    pub to_a: usize,
    pub from_b: usize,
    pub to_b: usize,
    pub inserted: String,
}

/// Which side of a replaced range a mapped position sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

/// Ordered list of replacements, applied one after another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    steps: Vec<ChangedRange>,
}

impl ChangeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from specs where each one is relative to the document left by
    /// the previous one
    pub fn sequential(specs: impl IntoIterator<Item = ChangeSpec>, doc_len: usize) -> Result<Self> {
        let mut len = doc_len;
        let mut steps = Vec::new();

        for spec in specs {
            if spec.from > spec.to || spec.to > len {
                return Err(EditorError::InvalidChange {
                    from: spec.from,
                    to: spec.to,
                    len,
                });
            }

            let inserted_len = utf16_len(&spec.insert);
            if spec.from == spec.to && inserted_len == 0 {
                continue;
            }

            len = len - (spec.to - spec.from) + inserted_len;
            steps.push(ChangedRange {
                from_a: spec.from,
                to_a: spec.to,
                from_b: spec.from,
                to_b: spec.from + inserted_len,
                inserted: spec.insert,
            });
        }

        Ok(Self { steps })
    }

    /// Build from specs that are all relative to the starting document and
    /// must not overlap
    pub fn simultaneous(specs: impl IntoIterator<Item = ChangeSpec>, doc_len: usize) -> Result<Self> {
        let mut specs: Vec<ChangeSpec> = specs.into_iter().collect();
        specs.sort_by_key(|spec| (spec.from, spec.to));

        let mut shifted = Vec::with_capacity(specs.len());
        let mut delta: isize = 0;
        let mut previous_end = 0;

        for spec in specs {
            if spec.from > spec.to || spec.to > doc_len {
                return Err(EditorError::InvalidChange {
                    from: spec.from,
                    to: spec.to,
                    len: doc_len,
                });
            }
            if spec.from < previous_end {
                return Err(EditorError::OverlappingChanges { at: spec.from });
            }
            previous_end = spec.to;

            let from = (spec.from as isize + delta) as usize;
            let to = (spec.to as isize + delta) as usize;
            delta += utf16_len(&spec.insert) as isize - (spec.to - spec.from) as isize;
            shifted.push(ChangeSpec::replace(from, to, spec.insert));
        }

        // Shifted changes always fall inside the evolving document
        Self::sequential(shifted, doc_len)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangedRange> {
        self.steps.iter()
    }

    /// Document length after applying this change-set to one of `old_len`
    pub fn new_length(&self, old_len: usize) -> usize {
        self.steps.iter().fold(old_len, |len, step| {
            len - (step.to_a - step.from_a) + (step.to_b - step.from_b)
        })
    }

    /// Map a position in the old document to the new one
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> usize {
        self.steps.iter().fold(pos, |pos, step| {
            if pos < step.from_a {
                pos
            } else if pos > step.to_a {
                pos - step.to_a + step.to_b
            } else if assoc == Assoc::Before {
                step.from_b
            } else {
                step.to_b
            }
        })
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangedRange;
    type IntoIter = std::slice::Iter<'a, ChangedRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
