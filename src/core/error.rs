use thiserror::Error;

/// Crate-level error type that aggregates the layer-specific errors
#[derive(Error, Debug)]
pub enum SyncError {
    /// Shared document errors
    #[error(transparent)]
    Document(#[from] crate::document::error::DocumentError),

    /// Editing surface errors
    #[error(transparent)]
    Editor(#[from] crate::editor::error::EditorError),

    /// Configuration layer errors
    #[error(transparent)]
    Config(#[from] crate::config::error::ConfigError),

    /// Replay script errors
    #[error("Invalid replay script: {0}")]
    Script(String),

    #[error("Failed to parse replay script: {0}")]
    ScriptParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for editor-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub fn script(msg: impl Into<String>) -> Self {
        SyncError::Script(msg.into())
    }

    /// Whether the error means the shared document is no longer attached
    pub fn is_detached(&self) -> bool {
        matches!(
            self,
            SyncError::Document(crate::document::error::DocumentError::Detached { .. })
        )
    }
}
