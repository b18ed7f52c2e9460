//! Workspace snapshot capture and restore
//!
//! The serialized form of the workspace used for restore-on-restart:
//! ordered pane snapshots of `{target, scroll}` pairs plus active-tab
//! indices, and the sidebar geometry. Terminal sessions are process-backed
//! and are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::manager::{SIDEBAR_MAX_WIDTH, SIDEBAR_MIN_WIDTH, Workspace};
use super::types::{PaneId, TabId};

/// One persisted tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabSnapshot {
    /// Vault path of the document
    pub target: String,
    /// Display name
    pub name: String,
    /// Scroll position in rendered lines
    #[serde(default)]
    pub scroll_offset: u16,
}

/// One persisted pane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneSnapshot {
    /// Tabs in display order
    #[serde(default)]
    pub tabs: Vec<TabSnapshot>,
    /// Index of the active tab, if any
    #[serde(default)]
    pub active_index: Option<usize>,
}

/// The persisted workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    /// Panes in display order
    #[serde(default)]
    pub panes: Vec<PaneSnapshot>,
    /// Sidebar width in logical pixels
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: f32,
    /// Sidebar visibility
    #[serde(default = "default_true")]
    pub sidebar_visible: bool,
    /// When this snapshot was captured
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

fn default_sidebar_width() -> f32 {
    240.0
}

fn default_true() -> bool {
    true
}

/// A content load the caller must issue after a restore
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoad {
    /// Pane holding the restored tab
    pub pane: PaneId,
    /// The restored tab
    pub tab: TabId,
    /// Vault path to fetch
    pub target: String,
}

impl WorkspaceSnapshot {
    /// Capture the current workspace state
    pub fn capture(workspace: &Workspace) -> Self {
        let panes = workspace
            .panes_in_order()
            .map(|pane| {
                let tabs = pane
                    .tabs_in_order()
                    .map(|tab| TabSnapshot {
                        target: tab.target.clone(),
                        name: tab.name.clone(),
                        scroll_offset: tab.scroll_offset,
                    })
                    .collect();
                let active_index = pane.active_id().and_then(|id| pane.index_of(id));
                PaneSnapshot { tabs, active_index }
            })
            .collect();

        Self {
            panes,
            sidebar_width: workspace.sidebar.width,
            sidebar_visible: workspace.sidebar.visible,
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a workspace from this snapshot.
    ///
    /// Content is never persisted: every restored tab starts pending and
    /// the returned loads must be issued against the file backend. A
    /// snapshot that would produce no panes falls back to a single fresh
    /// empty pane. Persisted active indices are re-applied only when still
    /// in range.
    pub fn restore(&self) -> (Workspace, Vec<PendingLoad>) {
        let mut workspace = Workspace::new();
        let mut loads = Vec::new();

        if self.panes.is_empty() {
            return (workspace, loads);
        }

        workspace.sidebar.width = self.sidebar_width.clamp(SIDEBAR_MIN_WIDTH, SIDEBAR_MAX_WIDTH);
        workspace.sidebar.visible = self.sidebar_visible;

        for (pane_index, pane_snapshot) in self.panes.iter().enumerate() {
            // The fresh workspace already carries its first pane
            let pane_id = if pane_index == 0 {
                workspace.active_id()
            } else {
                workspace.add_pane()
            };

            let pane = workspace
                .pane_mut(pane_id)
                .expect("restored pane must exist");

            for tab_snapshot in &pane_snapshot.tabs {
                let (tab_id, created) = pane.open_tab(
                    tab_snapshot.name.clone(),
                    tab_snapshot.target.clone(),
                    tab_snapshot.scroll_offset,
                );
                if created {
                    loads.push(PendingLoad {
                        pane: pane_id,
                        tab: tab_id,
                        target: tab_snapshot.target.clone(),
                    });
                }
            }

            // Re-apply the persisted active tab; out-of-range is ignored
            if let Some(index) = pane_snapshot.active_index {
                if let Some(id) = pane.tab_order().get(index).copied() {
                    pane.switch_to(id);
                }
            }
        }

        (workspace, loads)
    }
}
