//! Local editing surface: document state, sequential change-sets,
//! annotated transactions and the plugin seam the sync bridge hooks into.

pub mod change;
pub mod error;
pub mod state;
pub mod transaction;
pub mod view;

pub use change::{Assoc, ChangeSet, ChangeSpec, ChangedRange};
pub use error::EditorError;
pub use state::{EditorState, Selection, MAX_HISTORY_SIZE};
pub use transaction::{Annotation, Changes, Transaction, TransactionSpec};
pub use view::{EditorView, PluginFactory, ViewHandle, ViewPlugin, ViewUpdate};
