//! Persistent application state
//!
//! One JSON document under the data directory holding everything that
//! survives restarts: the last-opened vault, the workspace snapshot,
//! sidebar and terminal-panel geometry, zoom, and theme/font preferences.
//! Every field is `#[serde(default)]` so state files written by older
//! versions keep loading.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::workspace::{MAX_ZOOM, MIN_ZOOM, WorkspaceSnapshot};

use super::Config;

/// Persistent application state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    /// Last opened vault root
    pub last_vault: Option<PathBuf>,

    /// Full workspace snapshot (panes, tabs, scroll offsets)
    pub workspace: Option<WorkspaceSnapshot>,

    /// Sidebar width in logical pixels
    pub sidebar_width: f32,

    /// Sidebar visibility
    pub sidebar_visible: bool,

    /// UI zoom factor, clamped to [0.5, 3.0]
    pub zoom: f32,

    /// Terminal panel height in logical pixels
    pub terminal_height: f32,

    /// Terminal panel visibility
    pub terminal_visible: bool,

    /// Theme preference (consumed at startup by the view layer)
    pub theme: Option<String>,

    /// Font preference (consumed at startup by the view layer)
    pub font: Option<String>,

    /// Application version that last wrote this state
    pub version: String,

    /// Path to save state to (not serialized, set at load time)
    #[serde(skip)]
    state_path: Option<PathBuf>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            last_vault: None,
            workspace: None,
            sidebar_width: 240.0,
            sidebar_visible: true,
            zoom: 1.0,
            terminal_height: 300.0,
            terminal_visible: true,
            theme: None,
            font: None,
            version: String::new(),
            state_path: None,
        }
    }
}

impl AppState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        }
    }

    /// Load state from the default location
    pub fn load() -> Result<Self> {
        let path = Config::state_file_path()?;
        Self::load_from(&path)
    }

    /// Load state from a specific path.
    ///
    /// A missing file yields a fresh state; a malformed one is an error so
    /// callers can fall back explicitly.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            let mut state = Self::new();
            state.state_path = Some(path.clone());
            return Ok(state);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read state file: {}", e)))?;

        let mut state: AppState = serde_json::from_str(&content)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to parse state file: {}", e)))?;

        // Update version, clamp persisted numbers, remember path
        state.version = env!("CARGO_PKG_VERSION").to_string();
        state.zoom = state.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        state.state_path = Some(path.clone());

        Ok(state)
    }

    /// Save state to the remembered location (or default if none)
    pub fn save(&self) -> Result<()> {
        let path = match &self.state_path {
            Some(p) => p.clone(),
            None => Config::state_file_path()?,
        };
        self.save_to(&path)
    }

    /// Save state to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create state directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize state: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write state file: {}", e)))?;

        Ok(())
    }

    /// Set the zoom factor, clamped
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;
    use tempfile::TempDir;

    #[test]
    fn test_new_state_defaults() {
        let state = AppState::new();
        assert!(state.last_vault.is_none());
        assert!(state.workspace.is_none());
        assert!(state.sidebar_visible);
        assert_eq!(state.zoom, 1.0);
        assert_eq!(state.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let state_path = temp_dir.path().join("state.json");

        let mut ws = Workspace::new();
        ws.open_in_active("a.md", "a.md");

        let mut state = AppState::new();
        state.last_vault = Some(PathBuf::from("/tmp/vault"));
        state.workspace = Some(WorkspaceSnapshot::capture(&ws));
        state.sidebar_width = 300.0;
        state.save_to(&state_path).unwrap();

        let loaded = AppState::load_from(&state_path).unwrap();
        assert_eq!(loaded.last_vault, Some(PathBuf::from("/tmp/vault")));
        assert_eq!(loaded.sidebar_width, 300.0);
        assert_eq!(loaded.workspace.unwrap().panes.len(), 1);
    }

    #[test]
    fn test_load_missing_file_gives_fresh_state() {
        let temp_dir = TempDir::new().unwrap();
        let state_path = temp_dir.path().join("state.json");

        let state = AppState::load_from(&state_path).unwrap();
        assert!(state.workspace.is_none());
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let state_path = temp_dir.path().join("state.json");
        std::fs::write(&state_path, "{ not json").unwrap();

        assert!(AppState::load_from(&state_path).is_err());
    }

    #[test]
    fn test_load_clamps_zoom() {
        let temp_dir = TempDir::new().unwrap();
        let state_path = temp_dir.path().join("state.json");
        std::fs::write(&state_path, r#"{"zoom": 42.0}"#).unwrap();

        let state = AppState::load_from(&state_path).unwrap();
        assert_eq!(state.zoom, 3.0);
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let temp_dir = TempDir::new().unwrap();
        let state_path = temp_dir.path().join("state.json");
        std::fs::write(&state_path, r#"{"zoom": 1.5, "future_field": [1, 2, 3]}"#).unwrap();

        let state = AppState::load_from(&state_path).unwrap();
        assert_eq!(state.zoom, 1.5);
    }

    #[test]
    fn test_set_zoom_clamps() {
        let mut state = AppState::new();
        state.set_zoom(10.0);
        assert_eq!(state.zoom, 3.0);
        state.set_zoom(-10.0);
        assert_eq!(state.zoom, 0.5);
    }
}
