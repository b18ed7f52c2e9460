//! Editor pane - an ordered, addressable collection of tabs
//!
//! Tabs live in an id-keyed arena with the ordering kept in a separate
//! explicit sequence, so every operation addresses tabs by stable ID
//! instead of scanning.

use std::collections::HashMap;

use tracing::debug;

use super::types::{PaneId, Tab, TabId};

/// An editor pane owning an ordered collection of tabs
#[derive(Debug, Clone)]
pub struct EditorPane {
    /// Unique identifier
    pub id: PaneId,
    /// Tab arena
    tabs: HashMap<TabId, Tab>,
    /// Display order of tabs
    order: Vec<TabId>,
    /// Active tab; None only when the pane is empty
    active: Option<TabId>,
    /// Explicit width in logical pixels, if a resize gesture assigned one
    pub width: Option<f32>,
    /// Flex share used when no explicit width is set
    pub flex: f32,
}

impl EditorPane {
    /// Create a new empty pane
    pub fn new() -> Self {
        Self {
            id: PaneId::new(),
            tabs: HashMap::new(),
            order: Vec::new(),
            active: None,
            width: None,
            flex: 1.0,
        }
    }

    /// Number of tabs
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the pane has no tabs (the empty idle state)
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The active tab ID, if any
    pub fn active_id(&self) -> Option<TabId> {
        self.active
    }

    /// Get a tab by ID
    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.get(&id)
    }

    /// Get a mutable tab by ID
    pub fn tab_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        self.tabs.get_mut(&id)
    }

    /// The active tab, if any
    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.and_then(|id| self.tabs.get(&id))
    }

    /// The active tab, mutable
    pub fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        let id = self.active?;
        self.tabs.get_mut(&id)
    }

    /// Tabs in display order
    pub fn tabs_in_order(&self) -> impl Iterator<Item = &Tab> {
        self.order.iter().filter_map(|id| self.tabs.get(id))
    }

    /// Tab IDs in display order
    pub fn tab_order(&self) -> &[TabId] {
        &self.order
    }

    /// Position of a tab in the display order
    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.order.iter().position(|t| *t == id)
    }

    /// Find a tab by its target path
    pub fn find_by_target(&self, target: &str) -> Option<TabId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.tabs.get(id).is_some_and(|t| t.target == target))
    }

    /// Open a document in this pane.
    ///
    /// A pane never holds two tabs with the same target: opening an
    /// already-open target switches to it (ignoring `initial_scroll`).
    /// Otherwise a new tab is appended in Preview mode with a pending
    /// content load and activated. Returns the tab ID and whether it was
    /// newly created (the caller issues the backend read for new tabs).
    pub fn open_tab(
        &mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        initial_scroll: u16,
    ) -> (TabId, bool) {
        let target = target.into();

        if let Some(existing) = self.find_by_target(&target) {
            self.switch_to(existing);
            return (existing, false);
        }

        let mut tab = Tab::new(name, target);
        tab.scroll_offset = initial_scroll;
        let id = tab.id;

        self.tabs.insert(id, tab);
        self.order.push(id);
        self.switch_to(id);
        debug!("pane {}: opened tab {}", self.id, id);
        (id, true)
    }

    /// Switch the active tab.
    ///
    /// If the previously active tab was in editing mode its buffer is
    /// flushed into the content cache and the editor torn down before the
    /// new tab becomes active. Unknown IDs are ignored.
    pub fn switch_to(&mut self, id: TabId) {
        if !self.tabs.contains_key(&id) || self.active == Some(id) {
            return;
        }

        if let Some(prev) = self.active.and_then(|p| self.tabs.get_mut(&p)) {
            if prev.mode.is_editing() {
                prev.cancel_edit();
            }
        }

        self.active = Some(id);
    }

    /// Close a tab.
    ///
    /// When the active tab at index `i` is closed, the tab now at
    /// `min(i, new_len - 1)` becomes active; closing the last tab leaves
    /// the pane in its empty idle state.
    pub fn close_tab(&mut self, id: TabId) -> Option<Tab> {
        let index = self.index_of(id)?;
        let removed = self.tabs.remove(&id)?;
        self.order.remove(index);

        if self.active == Some(id) {
            self.active = if self.order.is_empty() {
                None
            } else {
                let next = index.min(self.order.len() - 1);
                Some(self.order[next])
            };
        }

        debug!("pane {}: closed tab {}", self.id, id);
        Some(removed)
    }

    /// Remove every tab, returning the pane to its empty idle state
    pub fn clear(&mut self) {
        self.tabs.clear();
        self.order.clear();
        self.active = None;
    }

    /// Move a tab to a new position in the display order
    pub fn move_tab(&mut self, id: TabId, to_index: usize) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        self.order.remove(from);
        let to = to_index.min(self.order.len());
        self.order.insert(to, id);
        true
    }

    /// Apply a drag-reorder drop: splice the dragged tab out of its old
    /// index and into the drop target's current index. Both tabs must live
    /// in this pane; otherwise no mutation happens.
    pub fn reorder_on_drop(&mut self, dragged: TabId, target: TabId) -> bool {
        if dragged == target || !self.tabs.contains_key(&dragged) {
            return false;
        }
        let Some(from) = self.index_of(dragged) else {
            return false;
        };
        self.order.remove(from);
        let Some(to) = self.index_of(target) else {
            // Target vanished mid-gesture; restore and bail
            self.order.insert(from, dragged);
            return false;
        };
        self.order.insert(to, dragged);
        debug!("pane {}: reordered tab {} -> index {}", self.id, dragged, to);
        true
    }

    /// Apply an asynchronous content load result.
    ///
    /// Returns false when the tab no longer exists (a stale response,
    /// silently discarded by the caller).
    pub fn apply_loaded(
        &mut self,
        id: TabId,
        result: std::result::Result<String, String>,
    ) -> bool {
        match self.tabs.get_mut(&id) {
            Some(tab) => {
                tab.apply_loaded(result);
                true
            }
            None => false,
        }
    }

    /// Apply a successful save acknowledgment for a tab.
    ///
    /// Returns false when the tab no longer exists or already left editing
    /// mode (stale acknowledgment).
    pub fn apply_saved(&mut self, id: TabId, text: String) -> bool {
        match self.tabs.get_mut(&id) {
            Some(tab) if tab.mode.is_editing() => {
                tab.apply_saved(text);
                true
            }
            _ => false,
        }
    }

    /// Check the pane invariants. Used by tests after every mutation.
    pub fn check_invariants(&self) -> bool {
        let arena_matches_order = self.order.len() == self.tabs.len()
            && self.order.iter().all(|id| self.tabs.contains_key(id));
        let active_is_member = match self.active {
            Some(id) => self.order.contains(&id),
            None => self.order.is_empty(),
        };
        let mut targets: Vec<&str> = self
            .tabs_in_order()
            .map(|t| t.target.as_str())
            .collect();
        targets.sort_unstable();
        let targets_unique = targets.windows(2).all(|w| w[0] != w[1]);

        arena_matches_order && active_is_member && targets_unique
    }
}

impl Default for EditorPane {
    fn default() -> Self {
        Self::new()
    }
}
