use thiserror::Error;

/// Editing surface errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("Change {from}..{to} is outside a document of length {len}")]
    InvalidChange { from: usize, to: usize, len: usize },

    #[error("Simultaneous changes overlap at offset {at}")]
    OverlappingChanges { at: usize },
}

pub type Result<T> = std::result::Result<T, EditorError>;
