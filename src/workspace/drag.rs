//! Drag gesture state owned by the workspace
//!
//! One gesture of a kind at a time, guarded here rather than by ambient
//! globals so multiple workspace instances (and unit tests) never
//! interfere. An abandoned gesture leaves the model unmutated.

use super::types::{PaneId, TabId};

/// The in-flight drag gesture, if any
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    /// No gesture in progress
    #[default]
    Idle,
    /// A tab is being dragged for reorder
    Tab {
        /// Pane the tab was picked up from
        source_pane: PaneId,
        /// The dragged tab
        tab: TabId,
    },
    /// A handle between two panes is being dragged
    Split {
        /// Handle index (between `order[handle]` and `order[handle + 1]`)
        handle: usize,
        /// Left neighbour width when the gesture began, logical px
        left_base: f32,
        /// Right neighbour width when the gesture began, logical px
        right_base: f32,
    },
    /// The sidebar edge is being dragged
    Sidebar,
    /// The terminal panel edge is being dragged
    TerminalPanel,
}

impl DragState {
    /// Whether no gesture is in progress
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Human-readable gesture kind, for error reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Idle => "none",
            Self::Tab { .. } => "tab drag",
            Self::Split { .. } => "split resize",
            Self::Sidebar => "sidebar resize",
            Self::TerminalPanel => "terminal panel resize",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state = DragState::default();
        assert!(state.is_idle());
        assert_eq!(state.kind(), "none");
    }

    #[test]
    fn test_kind_names() {
        let state = DragState::Tab {
            source_pane: PaneId::new(),
            tab: TabId::new(),
        };
        assert_eq!(state.kind(), "tab drag");
        assert!(!state.is_idle());
    }
}
