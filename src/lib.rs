//! Notedesk - a terminal knowledge-base workspace
//!
//! This crate provides a markdown vault browser, a multi-pane tabbed
//! editor, and an embedded terminal multiplexer over a pure workspace
//! state machine.
//!
//! # Architecture
//!
//! All state mutation happens on one event loop over an exclusively-owned
//! model; the file system and pseudo-terminal processes are reached only
//! through asynchronous command interfaces whose responses are validated
//! against current tab/session existence (stale responses are discarded).
//!
//! # Modules
//!
//! - [`workspace`] - pane/tab state machine, layout geometry, snapshots
//! - [`term`] - terminal multiplexer and the PTY process host
//! - [`links`] - `[[wiki-link]]` parsing and resolution
//! - [`vault`] - async file backend and content search
//! - [`render`] - markdown-to-styled-text boundary
//! - [`tui`] - event-driven terminal UI with ratatui
//! - [`config`] - configuration and state persistence
//! - [`error`] - error types

pub mod config;
pub mod error;
pub mod links;
pub mod render;
pub mod term;
pub mod tui;
pub mod vault;
pub mod workspace;

pub use config::{AppState, Config};
pub use error::{Error, Result};
pub use workspace::{
    EditorPane, PaneId, Tab, TabId, TabMode, Workspace, WorkspaceSnapshot,
};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
