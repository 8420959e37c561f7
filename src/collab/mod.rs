//! Collaborative editing extensions: the editor/document sync bridge and
//! remote selection tracking.

pub mod bridge;
pub mod remote_selections;

pub use bridge::{remote_transaction, EditorSyncBridge, SyncConfig, YSync};
pub use remote_selections::{RemoteSelection, RemoteSelections, SelectionTracker};

use crate::document::Document;
use crate::editor::PluginFactory;

/// Everything a view needs to collaborate on `doc`
pub struct CollabExtension {
    pub plugins: Vec<Box<dyn PluginFactory>>,
    pub selections: SelectionTracker,
}

/// Sync bridge plus remote selections for `doc`
pub fn collab_extension(doc: &Document) -> CollabExtension {
    let remote_selections = RemoteSelections::new(doc.clone());
    let selections = remote_selections.tracker();
    CollabExtension {
        plugins: vec![
            Box::new(YSync::new(SyncConfig::new(doc.clone()))),
            Box::new(remote_selections),
        ],
        selections,
    }
}
