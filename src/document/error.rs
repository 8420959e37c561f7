use thiserror::Error;

/// Shared document errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Document {key} is detached from its sync session")]
    Detached { key: String },

    #[error("Invalid range {from}..{to} for text of length {len}")]
    InvalidRange { from: usize, to: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, DocumentError>;
