//! Workspace model module
//!
//! The pure pane/tab state machine, independent of any rendering surface:
//! - `Workspace` - pane arena, layout geometry, drag gesture guards
//! - `EditorPane` - tab arena with open/switch/close/reorder
//! - `Tab` / `TabMode` - one open document and its Preview/Editing machine
//! - `WorkspaceSnapshot` - the persisted form used for restore-on-restart

mod drag;
mod manager;
mod pane;
mod snapshot;
mod types;

pub use drag::*;
pub use manager::*;
pub use pane::*;
pub use snapshot::*;
pub use types::*;
