//! TUI widgets
//!
//! Custom ratatui widgets for the application:
//! - `FileTree` - sidebar directory listing
//! - `TabBar` - per-pane tab strip with drag affordances
//! - `EditorView` - preview/editing content for one pane
//! - `TerminalView` - session strip and active terminal output

mod editor_view;
mod file_tree;
mod tab_bar;
mod terminal_view;

pub use editor_view::*;
pub use file_tree::*;
pub use tab_bar::*;
pub use terminal_view::*;
