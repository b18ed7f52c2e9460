//! Workspace - pane management and layout geometry
//!
//! Owns the ordered pane arena, the active-pane designation, sidebar and
//! terminal-panel geometry, the zoom factor, and the drag gesture guards.
//! All mutation happens synchronously on the owning event loop; geometry is
//! kept in zoom-independent logical pixels so gestures behave identically
//! at any zoom level.

use tracing::{debug, info};

use crate::error::WorkspaceError;

use super::drag::DragState;
use super::pane::EditorPane;
use super::types::{PaneId, TabId};

/// Minimum pane width in logical pixels during a split resize
pub const MIN_PANE_WIDTH: f32 = 150.0;

/// Sidebar width clamp, logical pixels
pub const SIDEBAR_MIN_WIDTH: f32 = 150.0;
pub const SIDEBAR_MAX_WIDTH: f32 = 600.0;

/// Terminal panel minimum height, logical pixels
pub const TERMINAL_MIN_HEIGHT: f32 = 100.0;
/// Terminal panel maximum height as a share of the window
pub const TERMINAL_MAX_HEIGHT_RATIO: f32 = 0.9;

/// Zoom factor clamp
pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;

/// Sidebar geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidebarState {
    /// Width in logical pixels
    pub width: f32,
    /// Whether the sidebar is shown
    pub visible: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            width: 240.0,
            visible: true,
        }
    }
}

/// Terminal panel geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalPanelState {
    /// Height in logical pixels
    pub height: f32,
    /// Whether the panel is shown
    pub visible: bool,
}

impl Default for TerminalPanelState {
    fn default() -> Self {
        Self {
            height: 300.0,
            visible: true,
        }
    }
}

/// The full pane workspace
#[derive(Debug)]
pub struct Workspace {
    panes: std::collections::HashMap<PaneId, EditorPane>,
    order: Vec<PaneId>,
    active: PaneId,
    /// Sidebar geometry
    pub sidebar: SidebarState,
    /// Terminal panel geometry
    pub terminal_panel: TerminalPanelState,
    zoom: f32,
    drag: DragState,
}

impl Workspace {
    /// Create a workspace with a single empty pane
    pub fn new() -> Self {
        let pane = EditorPane::new();
        let id = pane.id;
        let mut panes = std::collections::HashMap::new();
        panes.insert(id, pane);

        Self {
            panes,
            order: vec![id],
            active: id,
            sidebar: SidebarState::default(),
            terminal_panel: TerminalPanelState::default(),
            zoom: 1.0,
            drag: DragState::Idle,
        }
    }

    // ------------------------------------------------------------------
    // Pane access
    // ------------------------------------------------------------------

    /// Number of panes (always at least 1)
    pub fn pane_count(&self) -> usize {
        self.order.len()
    }

    /// Pane IDs in display order
    pub fn pane_order(&self) -> &[PaneId] {
        &self.order
    }

    /// The active pane's ID
    pub fn active_id(&self) -> PaneId {
        self.active
    }

    /// Get a pane by ID
    pub fn pane(&self, id: PaneId) -> Option<&EditorPane> {
        self.panes.get(&id)
    }

    /// Get a mutable pane by ID
    pub fn pane_mut(&mut self, id: PaneId) -> Option<&mut EditorPane> {
        self.panes.get_mut(&id)
    }

    /// The active pane
    pub fn active_pane(&self) -> &EditorPane {
        // Invariant: the active ID always refers to an existing pane
        &self.panes[&self.active]
    }

    /// The active pane, mutable
    pub fn active_pane_mut(&mut self) -> &mut EditorPane {
        self.panes
            .get_mut(&self.active)
            .expect("active pane must exist")
    }

    /// Panes in display order
    pub fn panes_in_order(&self) -> impl Iterator<Item = &EditorPane> {
        self.order.iter().filter_map(|id| self.panes.get(id))
    }

    // ------------------------------------------------------------------
    // Pane lifecycle
    // ------------------------------------------------------------------

    /// Append a new empty pane after the last one and make it active.
    ///
    /// The resize handle between it and its predecessor is implied by
    /// adjacency in the pane order.
    pub fn add_pane(&mut self) -> PaneId {
        let pane = EditorPane::new();
        let id = pane.id;
        self.panes.insert(id, pane);
        self.order.push(id);
        self.active = id;
        info!("added pane {}", id);
        id
    }

    /// Remove a pane.
    ///
    /// The sole remaining pane is cleared instead of removed. Otherwise the
    /// pane is detached, every remaining pane's explicit geometry resets to
    /// the even default, and if the removed pane was active the nearest
    /// remaining pane by original index becomes active.
    pub fn remove_pane(&mut self, id: PaneId) -> Result<(), WorkspaceError> {
        let index = self
            .order
            .iter()
            .position(|p| *p == id)
            .ok_or(WorkspaceError::PaneNotFound(id))?;

        if self.order.len() == 1 {
            // Last pane: clear, don't delete
            self.panes
                .get_mut(&id)
                .ok_or(WorkspaceError::PaneNotFound(id))?
                .clear();
            debug!("cleared sole pane {}", id);
            return Ok(());
        }

        self.panes.remove(&id);
        self.order.remove(index);

        // Explicit widths no longer describe the new layout
        for pane in self.panes.values_mut() {
            pane.width = None;
            pane.flex = 1.0;
        }

        if self.active == id {
            let next = index.min(self.order.len() - 1);
            self.active = self.order[next];
        }

        info!("removed pane {}", id);
        Ok(())
    }

    /// Mark a pane active; all others are deactivated
    pub fn set_active(&mut self, id: PaneId) -> Result<(), WorkspaceError> {
        if !self.panes.contains_key(&id) {
            return Err(WorkspaceError::PaneNotFound(id));
        }
        self.active = id;
        Ok(())
    }

    /// Open a document in the active pane, creating a pane first if the
    /// workspace were ever empty. Returns the pane, the tab, and whether a
    /// new tab (needing a content load) was created.
    pub fn open_in_active(
        &mut self,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> (PaneId, TabId, bool) {
        if self.order.is_empty() {
            self.add_pane();
        }
        let pane_id = self.active;
        let (tab_id, created) = self
            .panes
            .get_mut(&pane_id)
            .expect("active pane must exist")
            .open_tab(name, target, 0);
        (pane_id, tab_id, created)
    }

    // ------------------------------------------------------------------
    // Zoom
    // ------------------------------------------------------------------

    /// Current zoom factor
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom factor, clamped to [0.5, 3.0]. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom
    }

    /// Convert a raw pointer delta to zoom-independent logical pixels
    pub fn to_logical(&self, raw_delta: f32) -> f32 {
        raw_delta / self.zoom
    }

    // ------------------------------------------------------------------
    // Drag gestures
    // ------------------------------------------------------------------

    /// The current drag state
    pub fn drag(&self) -> &DragState {
        &self.drag
    }

    fn guard_idle(&self) -> Result<(), WorkspaceError> {
        if self.drag.is_idle() {
            Ok(())
        } else {
            Err(WorkspaceError::GestureInProgress(self.drag.kind()))
        }
    }

    /// Begin dragging a tab for reorder
    pub fn begin_tab_drag(&mut self, pane: PaneId, tab: TabId) -> Result<(), WorkspaceError> {
        self.guard_idle()?;
        let source = self.pane(pane).ok_or(WorkspaceError::PaneNotFound(pane))?;
        if source.tab(tab).is_none() {
            return Err(WorkspaceError::TabNotFound(tab));
        }
        self.drag = DragState::Tab {
            source_pane: pane,
            tab,
        };
        Ok(())
    }

    /// Complete a tab drag by dropping onto another tab.
    ///
    /// Reorder happens only within the source pane; a drop into a different
    /// pane is ignored. Returns whether the model was mutated.
    pub fn complete_tab_drag(&mut self, target_pane: PaneId, target_tab: TabId) -> bool {
        let DragState::Tab { source_pane, tab } = std::mem::take(&mut self.drag) else {
            return false;
        };

        if target_pane != source_pane {
            debug!("cross-pane tab drop ignored");
            return false;
        }

        self.panes
            .get_mut(&source_pane)
            .is_some_and(|p| p.reorder_on_drop(tab, target_tab))
    }

    /// Begin a split resize on the handle between `pane_order()[handle]`
    /// and its right neighbour. The caller supplies the neighbours'
    /// current rendered widths in logical pixels.
    pub fn begin_split_resize(
        &mut self,
        handle: usize,
        left_width: f32,
        right_width: f32,
    ) -> Result<(), WorkspaceError> {
        self.guard_idle()?;
        if handle + 1 >= self.order.len() {
            return Err(WorkspaceError::HandleNotFound(handle));
        }
        self.drag = DragState::Split {
            handle,
            left_base: left_width,
            right_base: right_width,
        };
        Ok(())
    }

    /// Apply a split resize for the in-flight gesture.
    ///
    /// The raw pointer delta is divided by the zoom factor; only the two
    /// neighbour panes change, their combined width is preserved and each
    /// is clamped to the minimum pane width.
    pub fn split_resize_by(&mut self, raw_delta: f32) {
        let DragState::Split {
            handle,
            left_base,
            right_base,
        } = self.drag
        else {
            return;
        };

        let total = left_base + right_base;
        if total < MIN_PANE_WIDTH * 2.0 {
            return;
        }

        let delta = self.to_logical(raw_delta);
        let left = (left_base + delta).clamp(MIN_PANE_WIDTH, total - MIN_PANE_WIDTH);
        let right = total - left;

        let (left_id, right_id) = (self.order[handle], self.order[handle + 1]);
        if let Some(pane) = self.panes.get_mut(&left_id) {
            pane.width = Some(left);
        }
        if let Some(pane) = self.panes.get_mut(&right_id) {
            pane.width = Some(right);
        }
    }

    /// Begin a sidebar resize gesture
    pub fn begin_sidebar_resize(&mut self) -> Result<(), WorkspaceError> {
        self.guard_idle()?;
        self.drag = DragState::Sidebar;
        Ok(())
    }

    /// Move the sidebar edge to an absolute logical position
    pub fn sidebar_resize_to(&mut self, logical_width: f32) {
        if !matches!(self.drag, DragState::Sidebar) {
            return;
        }
        self.sidebar.width = logical_width.clamp(SIDEBAR_MIN_WIDTH, SIDEBAR_MAX_WIDTH);
    }

    /// Begin a terminal panel resize gesture
    pub fn begin_terminal_resize(&mut self) -> Result<(), WorkspaceError> {
        self.guard_idle()?;
        self.drag = DragState::TerminalPanel;
        Ok(())
    }

    /// Move the terminal panel edge to an absolute logical height
    pub fn terminal_resize_to(&mut self, logical_height: f32, window_height: f32) {
        if !matches!(self.drag, DragState::TerminalPanel) {
            return;
        }
        let max = (window_height * TERMINAL_MAX_HEIGHT_RATIO).max(TERMINAL_MIN_HEIGHT);
        self.terminal_panel.height = logical_height.clamp(TERMINAL_MIN_HEIGHT, max);
    }

    /// End the in-flight resize gesture.
    ///
    /// Returns true when a persistence save should be committed (resize
    /// gestures save on gesture end, not per move event). Ending a tab
    /// drag without a drop target abandons it with no mutation.
    pub fn end_gesture(&mut self) -> bool {
        match std::mem::take(&mut self.drag) {
            DragState::Idle => false,
            DragState::Tab { .. } => false,
            DragState::Split { .. } | DragState::Sidebar | DragState::TerminalPanel => true,
        }
    }

    /// Abandon the in-flight gesture, leaving the model unmutated
    pub fn cancel_gesture(&mut self) {
        self.drag = DragState::Idle;
    }

    // ------------------------------------------------------------------
    // Visibility toggles
    // ------------------------------------------------------------------

    /// Toggle sidebar visibility
    pub fn toggle_sidebar(&mut self) {
        self.sidebar.visible = !self.sidebar.visible;
    }

    /// Toggle terminal panel visibility
    pub fn toggle_terminal_panel(&mut self) {
        self.terminal_panel.visible = !self.terminal_panel.visible;
    }

    /// Check workspace invariants. Used by tests after every mutation.
    pub fn check_invariants(&self) -> bool {
        !self.order.is_empty()
            && self.order.len() == self.panes.len()
            && self.order.iter().all(|id| self.panes.contains_key(id))
            && self.order.contains(&self.active)
            && (MIN_ZOOM..=MAX_ZOOM).contains(&self.zoom)
            && self.panes.values().all(|p| p.check_invariants())
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workspace_has_one_empty_pane() {
        let ws = Workspace::new();
        assert_eq!(ws.pane_count(), 1);
        assert!(ws.active_pane().is_empty());
        assert!(ws.check_invariants());
    }

    #[test]
    fn test_add_pane_appends_and_activates() {
        let mut ws = Workspace::new();
        let first = ws.active_id();
        let second = ws.add_pane();

        assert_eq!(ws.pane_count(), 2);
        assert_eq!(ws.active_id(), second);
        assert_eq!(ws.pane_order(), &[first, second]);
        assert!(ws.check_invariants());
    }

    #[test]
    fn test_remove_sole_pane_clears_instead() {
        let mut ws = Workspace::new();
        let id = ws.active_id();
        ws.open_in_active("a.md", "a.md");

        ws.remove_pane(id).unwrap();
        assert_eq!(ws.pane_count(), 1);
        assert_eq!(ws.active_pane().len(), 0);
    }

    #[test]
    fn test_remove_active_pane_activates_nearest_by_index() {
        let mut ws = Workspace::new();
        let a = ws.active_id();
        let b = ws.add_pane();
        let c = ws.add_pane();

        ws.set_active(b).unwrap();
        ws.remove_pane(b).unwrap();

        // b was at index 1; c is now at index 1
        assert_eq!(ws.active_id(), c);
        assert_eq!(ws.pane_order(), &[a, c]);

        ws.set_active(c).unwrap();
        ws.remove_pane(c).unwrap();
        // c was at index 1, clamped to the last remaining index 0
        assert_eq!(ws.active_id(), a);
    }

    #[test]
    fn test_remove_pane_resets_explicit_widths() {
        let mut ws = Workspace::new();
        let a = ws.active_id();
        let b = ws.add_pane();
        ws.add_pane();

        ws.begin_split_resize(0, 400.0, 400.0).unwrap();
        ws.split_resize_by(100.0);
        ws.end_gesture();
        assert!(ws.pane(a).unwrap().width.is_some());

        ws.remove_pane(b).unwrap();
        assert!(ws.panes_in_order().all(|p| p.width.is_none() && p.flex == 1.0));
    }

    #[test]
    fn test_open_in_active_on_fresh_workspace() {
        let mut ws = Workspace::new();
        let (pane, tab, created) = ws.open_in_active("x.md", "root/x.md");

        assert!(created);
        assert_eq!(ws.pane_count(), 1);
        assert_eq!(ws.active_id(), pane);
        assert_eq!(ws.active_pane().active_id(), Some(tab));
        assert_eq!(ws.active_pane().len(), 1);
    }

    #[test]
    fn test_zoom_clamping() {
        let mut ws = Workspace::new();
        assert_eq!(ws.set_zoom(10.0), 3.0);
        assert_eq!(ws.set_zoom(-10.0), 0.5);
        assert_eq!(ws.set_zoom(1.25), 1.25);
    }

    #[test]
    fn test_split_resize_preserves_total_and_clamps() {
        let mut ws = Workspace::new();
        ws.add_pane();
        let (a, b) = (ws.pane_order()[0], ws.pane_order()[1]);

        ws.begin_split_resize(0, 400.0, 400.0).unwrap();
        ws.split_resize_by(150.0);
        assert!(ws.end_gesture());

        let left = ws.pane(a).unwrap().width.unwrap();
        let right = ws.pane(b).unwrap().width.unwrap();
        assert_eq!(left, 550.0);
        assert_eq!(left + right, 800.0);

        // Dragging far past the edge clamps the neighbour at the minimum
        ws.begin_split_resize(0, left, right).unwrap();
        ws.split_resize_by(10_000.0);
        ws.end_gesture();
        assert_eq!(ws.pane(b).unwrap().width.unwrap(), MIN_PANE_WIDTH);
        assert_eq!(
            ws.pane(a).unwrap().width.unwrap() + ws.pane(b).unwrap().width.unwrap(),
            800.0
        );
    }

    #[test]
    fn test_split_resize_is_zoom_independent() {
        let mut ws = Workspace::new();
        ws.add_pane();
        ws.set_zoom(2.0);

        ws.begin_split_resize(0, 400.0, 400.0).unwrap();
        // Raw delta of 100 at zoom 2.0 is 50 logical px
        ws.split_resize_by(100.0);
        ws.end_gesture();

        let left = ws.pane(ws.pane_order()[0]).unwrap().width.unwrap();
        assert_eq!(left, 450.0);
    }

    #[test]
    fn test_gesture_reentrancy_guard() {
        let mut ws = Workspace::new();
        ws.add_pane();

        ws.begin_split_resize(0, 300.0, 300.0).unwrap();
        let err = ws.begin_sidebar_resize().unwrap_err();
        assert!(matches!(err, WorkspaceError::GestureInProgress(_)));

        ws.cancel_gesture();
        ws.begin_sidebar_resize().unwrap();
        ws.cancel_gesture();
    }

    #[test]
    fn test_abandoned_tab_drag_is_noop() {
        let mut ws = Workspace::new();
        let pane = ws.active_id();
        ws.open_in_active("a.md", "a.md");
        ws.open_in_active("b.md", "b.md");
        let order: Vec<TabId> = ws.active_pane().tab_order().to_vec();

        ws.begin_tab_drag(pane, order[1]).unwrap();
        // Pointer released without registering a drop target
        assert!(!ws.end_gesture());

        assert_eq!(ws.active_pane().tab_order(), order.as_slice());
        assert!(ws.drag().is_idle());
    }

    #[test]
    fn test_cross_pane_drop_is_noop() {
        let mut ws = Workspace::new();
        let first = ws.active_id();
        ws.open_in_active("a.md", "a.md");
        ws.open_in_active("b.md", "b.md");
        let dragged = ws.active_pane().tab_order()[1];

        let second = ws.add_pane();
        ws.set_active(second).unwrap();
        ws.open_in_active("c.md", "c.md");
        let foreign_target = ws.pane(second).unwrap().tab_order()[0];

        ws.begin_tab_drag(first, dragged).unwrap();
        assert!(!ws.complete_tab_drag(second, foreign_target));

        let order: Vec<&str> = ws
            .pane(first)
            .unwrap()
            .tabs_in_order()
            .map(|t| t.target.as_str())
            .collect();
        assert_eq!(order, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_sidebar_and_terminal_clamps() {
        let mut ws = Workspace::new();

        ws.begin_sidebar_resize().unwrap();
        ws.sidebar_resize_to(10.0);
        assert_eq!(ws.sidebar.width, SIDEBAR_MIN_WIDTH);
        ws.sidebar_resize_to(5000.0);
        assert_eq!(ws.sidebar.width, SIDEBAR_MAX_WIDTH);
        assert!(ws.end_gesture());

        ws.begin_terminal_resize().unwrap();
        ws.terminal_resize_to(10.0, 1000.0);
        assert_eq!(ws.terminal_panel.height, TERMINAL_MIN_HEIGHT);
        ws.terminal_resize_to(5000.0, 1000.0);
        assert_eq!(ws.terminal_panel.height, 900.0);
        assert!(ws.end_gesture());
    }
}
