//! Error types for notedesk
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.

use std::path::PathBuf;

use thiserror::Error;

use crate::term::TerminalId;
use crate::workspace::{PaneId, TabId};

/// Top-level error type for notedesk
#[derive(Error, Debug)]
pub enum Error {
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Terminal error: {0}")]
    Terminal(#[from] TerminalError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TUI error: {0}")]
    Tui(#[from] TuiError),
}

/// Workspace model errors (panes, tabs, gestures)
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Pane not found: {0}")]
    PaneNotFound(PaneId),

    #[error("Tab not found: {0}")]
    TabNotFound(TabId),

    #[error("No resize handle at index {0}")]
    HandleNotFound(usize),

    #[error("A {0} gesture is already in progress")]
    GestureInProgress(&'static str),
}

/// File backend errors
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Backend operation failed on {path}: {source}")]
    Backend {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VaultError {
    /// Classify an IO error against the path it occurred on
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            _ => Self::Backend { path, source: err },
        }
    }
}

/// Terminal multiplexer and process host errors
#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("Terminal session not found: {0}")]
    SessionNotFound(TerminalId),

    #[error("Terminal session {0} is not connected")]
    NotConnected(TerminalId),

    #[error("No terminal session is active")]
    NoActiveSession,

    #[error("Failed to spawn backing process: {0}")]
    SpawnFailed(String),

    #[error("PTY error: {0}")]
    Pty(String),
}

impl From<pty_process::Error> for TerminalError {
    fn from(e: pty_process::Error) -> Self {
        TerminalError::Pty(e.to_string())
    }
}

impl From<pty_process::Error> for Error {
    fn from(e: pty_process::Error) -> Self {
        Error::Terminal(TerminalError::Pty(e.to_string()))
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Failed to create config directory: {0}")]
    DirectoryCreationFailed(PathBuf),
}

/// TUI-related errors
#[derive(Error, Debug)]
pub enum TuiError {
    #[error("Failed to initialize terminal: {0}")]
    InitFailed(String),

    #[error("Failed to restore terminal: {0}")]
    RestoreFailed(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Event handling error: {0}")]
    EventError(String),
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkspaceError::TabNotFound(TabId::new());
        assert!(err.to_string().contains("Tab not found"));

        let err = VaultError::NotFound(PathBuf::from("/tmp/missing.md"));
        assert!(err.to_string().contains("/tmp/missing.md"));

        let err = TerminalError::SpawnFailed("no shell".to_string());
        assert!(err.to_string().contains("no shell"));
    }

    #[test]
    fn test_error_conversion() {
        let ws_err = WorkspaceError::GestureInProgress("tab drag");
        let _top_err: Error = ws_err.into();

        let vault_err = VaultError::PermissionDenied(PathBuf::from("/root/secret"));
        let _top_err: Error = vault_err.into();
    }

    #[test]
    fn test_vault_error_classification() {
        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(
            VaultError::from_io("/a", not_found),
            VaultError::NotFound(_)
        ));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            VaultError::from_io("/b", denied),
            VaultError::PermissionDenied(_)
        ));

        let other = std::io::Error::other("disk on fire");
        assert!(matches!(
            VaultError::from_io("/c", other),
            VaultError::Backend { .. }
        ));
    }
}
