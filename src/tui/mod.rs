//! Terminal UI module using ratatui
//!
//! The view layer subscribing to the workspace model:
//! - Sidebar file tree, tabbed editor panes, terminal panel
//! - Mouse-driven drag gestures (tab reorder, split/sidebar/panel resize)
//! - Modal overlays for input, confirmation, search, and help

mod app;
mod event;
mod theme;
mod widgets;

pub use app::*;
pub use event::*;
pub use theme::*;
