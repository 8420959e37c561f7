//! Bidirectional synchronization between a local text editor and a shared
//! CRDT document.
//!
//! The [`collab::EditorSyncBridge`] turns local editor transactions into
//! document edits and remote document changes into editor transactions,
//! tagging the latter so they are never sent back.

pub mod collab;
pub mod config;
pub mod core;
pub mod document;
pub mod editor;
pub mod relay;
pub mod replay;

pub use crate::collab::{collab_extension, EditorSyncBridge, SyncConfig};
pub use crate::core::{Result, SyncError};
pub use crate::document::Document;
pub use crate::editor::{EditorState, EditorView};
pub use crate::relay::Relay;
