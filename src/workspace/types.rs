//! Core workspace types
//!
//! Defines the identifiers and the tab record used by the pane model:
//! - `PaneId` / `TabId` - stable identifiers for arena-style addressing
//! - `Tab` - one open document inside a pane
//! - `TabMode` - the Preview/Editing state machine as a tagged variant

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an editor pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaneId(Uuid);

impl PaneId {
    /// Create a new random pane ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PaneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Use first 8 chars for display
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Unique identifier for a tab within a pane
///
/// Never reused: a response addressed to a closed tab's ID can always be
/// recognized as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(Uuid);

impl TabId {
    /// Create a new random tab ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Whether a tab's content has been fetched from the file backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentState {
    /// A read is outstanding; the cache holds a placeholder
    #[default]
    Pending,
    /// The cache holds real content (or a readable error placeholder)
    Ready,
}

/// Render mode of a tab
///
/// A tagged variant rather than boolean flags: a dirty edit buffer cannot
/// exist outside of `Editing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabMode {
    /// Rendered read-only view of the content cache
    Preview,
    /// An editable buffer seeded from the content cache
    Editing {
        /// The in-progress edit buffer
        draft: String,
        /// True once the draft diverges from the content cache
        dirty: bool,
    },
}

impl TabMode {
    /// Check whether this tab is in editing mode
    pub fn is_editing(&self) -> bool {
        matches!(self, Self::Editing { .. })
    }
}

/// A tab addresses one open document inside a pane
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    /// Unique identifier
    pub id: TabId,
    /// Vault path of the document (external identity, dedup key)
    pub target: String,
    /// Display name (file name)
    pub name: String,
    /// Last-known buffer text; an error placeholder when the load failed
    pub content_cache: String,
    /// Whether a backend read is still outstanding
    pub content_state: ContentState,
    /// Scroll position in rendered lines
    pub scroll_offset: u16,
    /// Preview/Editing state machine
    pub mode: TabMode,
}

impl Tab {
    /// Create a new tab in Preview mode with a pending content load
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: TabId::new(),
            target: target.into(),
            name: name.into(),
            content_cache: String::new(),
            content_state: ContentState::Pending,
            scroll_offset: 0,
            mode: TabMode::Preview,
        }
    }

    /// Apply the result of an asynchronous content load.
    ///
    /// Failures are folded into a readable placeholder; the tab stays open
    /// either way. An outstanding edit draft is left untouched.
    pub fn apply_loaded(&mut self, result: std::result::Result<String, String>) {
        self.content_cache = match result {
            Ok(text) => text,
            Err(reason) => format!("⚠ Cannot read {}: {}", self.target, reason),
        };
        self.content_state = ContentState::Ready;
    }

    /// Enter editing mode, seeding the draft from the content cache
    pub fn begin_edit(&mut self) {
        if self.mode.is_editing() {
            return;
        }
        self.mode = TabMode::Editing {
            draft: self.content_cache.clone(),
            dirty: false,
        };
    }

    /// Leave editing mode without saving.
    ///
    /// The latest draft is preserved into the content cache so re-entering
    /// Edit does not lose unsaved keystrokes.
    pub fn cancel_edit(&mut self) {
        if let TabMode::Editing { draft, .. } = std::mem::replace(&mut self.mode, TabMode::Preview) {
            self.content_cache = draft;
        }
    }

    /// Apply a successful save: the saved text becomes the content cache
    /// and the tab transitions back to Preview.
    pub fn apply_saved(&mut self, text: String) {
        self.content_cache = text;
        self.mode = TabMode::Preview;
    }

    /// Mutate the edit draft. Every content change marks the draft dirty.
    ///
    /// Returns false when the tab is not in editing mode.
    pub fn edit_draft(&mut self, f: impl FnOnce(&mut String)) -> bool {
        match &mut self.mode {
            TabMode::Editing { draft, dirty } => {
                f(draft);
                *dirty = true;
                true
            }
            TabMode::Preview => false,
        }
    }

    /// The current edit draft, if editing
    pub fn draft(&self) -> Option<&str> {
        match &self.mode {
            TabMode::Editing { draft, .. } => Some(draft),
            TabMode::Preview => None,
        }
    }

    /// Whether the tab holds unsaved edits
    pub fn is_dirty(&self) -> bool {
        matches!(self.mode, TabMode::Editing { dirty: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(PaneId::new().to_string().len(), 8);
        assert_eq!(TabId::new().to_string().len(), 8);
    }

    #[test]
    fn test_new_tab_is_pending_preview() {
        let tab = Tab::new("notes.md", "vault/notes.md");
        assert_eq!(tab.content_state, ContentState::Pending);
        assert_eq!(tab.mode, TabMode::Preview);
        assert!(tab.content_cache.is_empty());
        assert!(!tab.is_dirty());
    }

    #[test]
    fn test_apply_loaded_failure_keeps_tab_open() {
        let mut tab = Tab::new("secret.md", "vault/secret.md");
        tab.apply_loaded(Err("permission denied".to_string()));
        assert_eq!(tab.content_state, ContentState::Ready);
        assert!(tab.content_cache.contains("permission denied"));
        assert!(tab.content_cache.contains("vault/secret.md"));
    }

    #[test]
    fn test_edit_cycle_preserves_draft_on_cancel() {
        let mut tab = Tab::new("a.md", "a.md");
        tab.apply_loaded(Ok("original".to_string()));

        tab.begin_edit();
        assert!(tab.edit_draft(|d| d.push_str(" + edits")));
        assert!(tab.is_dirty());

        tab.cancel_edit();
        assert_eq!(tab.mode, TabMode::Preview);
        // Cancel did not save, but the keystrokes survive in the cache
        assert_eq!(tab.content_cache, "original + edits");
    }

    #[test]
    fn test_save_clears_dirty_and_returns_to_preview() {
        let mut tab = Tab::new("a.md", "a.md");
        tab.apply_loaded(Ok("one".to_string()));

        tab.begin_edit();
        tab.edit_draft(|d| *d = "two".to_string());
        tab.apply_saved("two".to_string());

        assert_eq!(tab.mode, TabMode::Preview);
        assert_eq!(tab.content_cache, "two");
        assert!(!tab.is_dirty());
    }

    #[test]
    fn test_edit_draft_outside_editing_is_rejected() {
        let mut tab = Tab::new("a.md", "a.md");
        assert!(!tab.edit_draft(|d| d.push('x')));
        assert!(tab.content_cache.is_empty());
    }
}
