//! Event handling for the TUI
//!
//! Provides an async event stream that combines:
//! - Terminal input events (keyboard, mouse)
//! - File backend responses
//! - Terminal session output
//! - Render ticks

use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyCode, KeyEvent, KeyModifiers};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::term::TermEvent;
use crate::vault::{FileEntry, SearchHit};
use crate::workspace::{PaneId, TabId};

/// Application events
#[derive(Debug)]
pub enum AppEvent {
    /// Terminal input event
    Input(InputEvent),
    /// File backend response
    Vault(VaultEvent),
    /// Terminal session output or exit
    Term(TermEvent),
    /// Render tick
    Tick,
    /// Request to quit the application
    Quit,
}

/// Input events from the terminal
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// Key press
    Key(KeyEvent),
    /// Mouse event
    Mouse(crossterm::event::MouseEvent),
    /// Terminal resize
    Resize(u16, u16),
}

/// Responses from asynchronous file backend round-trips.
///
/// Every response carries the IDs it was issued for; responses addressed
/// to tabs or generations that no longer exist are stale and get dropped.
#[derive(Debug)]
pub enum VaultEvent {
    /// A directory listing resolved
    DirListed {
        generation: u64,
        dir: PathBuf,
        result: std::result::Result<Vec<FileEntry>, String>,
    },
    /// A tab's content read resolved
    FileLoaded {
        pane: PaneId,
        tab: TabId,
        result: std::result::Result<String, String>,
    },
    /// A tab's save write resolved
    FileSaved {
        pane: PaneId,
        tab: TabId,
        text: String,
        result: std::result::Result<(), String>,
    },
    /// A create/rename/delete mutation resolved
    MutationDone {
        action: String,
        result: std::result::Result<(), String>,
        /// Entry to open in the active pane on success
        open: Option<FileEntry>,
    },
    /// A debounced search query resolved
    SearchResults {
        generation: u64,
        result: std::result::Result<Vec<SearchHit>, String>,
    },
}

/// User commands triggered by input in browse mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Navigate up (sidebar selection or editor scroll)
    NavigateUp,
    /// Navigate down
    NavigateDown,
    /// Activate the current selection
    Select,
    /// Go to the parent directory
    ParentDir,
    /// Cycle focus between sidebar, editor, and terminal
    FocusNext,

    /// Create a new file in the current directory
    NewFile,
    /// Create a new directory
    NewDir,
    /// Rename the selected entry
    RenameEntry,
    /// Delete the selected entry
    DeleteEntry,
    /// Open the search modal
    OpenSearch,

    /// Toggle sidebar visibility
    ToggleSidebar,
    /// Toggle terminal panel visibility
    ToggleTerminal,
    /// Create a new terminal session
    NewTerminal,
    /// Switch to the next terminal session
    NextTerminal,
    /// Close the active terminal session
    CloseTerminal,

    /// Split: add a new pane
    SplitPane,
    /// Close the active pane
    ClosePane,
    /// Focus the next pane
    NextPane,
    /// Switch to the previous tab in the active pane
    PrevTab,
    /// Switch to the next tab
    NextTab,
    /// Move the active tab left
    MoveTabLeft,
    /// Move the active tab right
    MoveTabRight,
    /// Close the active tab
    CloseTab,

    /// Enter editing mode on the active tab
    EditMode,
    /// Select the next cross-reference link in the preview
    NextLink,
    /// Open the active document in the external editor
    OpenInEditor,

    /// Zoom in
    ZoomIn,
    /// Zoom out
    ZoomOut,
    /// Page up in the focused content
    PageUp,
    /// Page down
    PageDown,

    /// Show help
    ShowHelp,
    /// Quit application
    Quit,
    /// Cancel current operation
    Cancel,
}

impl UserCommand {
    /// Convert a key event to a browse-mode command.
    ///
    /// Editing mode and terminal focus are handled before this mapping;
    /// keys that reach here drive the workspace.
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        match (key.code, key.modifiers) {
            // Navigation
            (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => {
                Some(UserCommand::NavigateUp)
            }
            (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => {
                Some(UserCommand::NavigateDown)
            }
            (KeyCode::Enter, _) => Some(UserCommand::Select),
            (KeyCode::Backspace, _) => Some(UserCommand::ParentDir),
            (KeyCode::Tab, _) => Some(UserCommand::FocusNext),

            // Vault entries
            (KeyCode::Char('n'), KeyModifiers::NONE) => Some(UserCommand::NewFile),
            (KeyCode::Char('N'), KeyModifiers::SHIFT) => Some(UserCommand::NewDir),
            (KeyCode::Char('r'), KeyModifiers::NONE) => Some(UserCommand::RenameEntry),
            (KeyCode::Char('d'), KeyModifiers::NONE) => Some(UserCommand::DeleteEntry),
            (KeyCode::Char('/'), _) => Some(UserCommand::OpenSearch),

            // Regions
            (KeyCode::Char('b'), KeyModifiers::CONTROL) => Some(UserCommand::ToggleSidebar),
            (KeyCode::Char('j'), KeyModifiers::CONTROL) => Some(UserCommand::ToggleTerminal),
            (KeyCode::Char('t'), KeyModifiers::NONE) => Some(UserCommand::NewTerminal),
            (KeyCode::Char('T'), KeyModifiers::SHIFT) => Some(UserCommand::NextTerminal),
            (KeyCode::Char('W'), KeyModifiers::SHIFT) => Some(UserCommand::CloseTerminal),

            // Panes and tabs
            (KeyCode::Char('s'), KeyModifiers::NONE) => Some(UserCommand::SplitPane),
            (KeyCode::Char('X'), KeyModifiers::SHIFT) => Some(UserCommand::ClosePane),
            (KeyCode::Char('p'), KeyModifiers::NONE) => Some(UserCommand::NextPane),
            (KeyCode::Char('h'), KeyModifiers::NONE) | (KeyCode::Left, KeyModifiers::NONE) => {
                Some(UserCommand::PrevTab)
            }
            (KeyCode::Char('l'), KeyModifiers::NONE) | (KeyCode::Right, KeyModifiers::NONE) => {
                Some(UserCommand::NextTab)
            }
            (KeyCode::Char('H'), KeyModifiers::SHIFT) => Some(UserCommand::MoveTabLeft),
            (KeyCode::Char('L'), KeyModifiers::SHIFT) => Some(UserCommand::MoveTabRight),
            (KeyCode::Char('w'), KeyModifiers::NONE) => Some(UserCommand::CloseTab),

            // Content
            (KeyCode::Char('e'), KeyModifiers::NONE) => Some(UserCommand::EditMode),
            (KeyCode::Char('f'), KeyModifiers::NONE) => Some(UserCommand::NextLink),
            (KeyCode::Char('o'), KeyModifiers::NONE) => Some(UserCommand::OpenInEditor),

            // Zoom
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), KeyModifiers::NONE) => {
                Some(UserCommand::ZoomIn)
            }
            (KeyCode::Char('-'), KeyModifiers::NONE) => Some(UserCommand::ZoomOut),

            // Scrolling
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => Some(UserCommand::PageUp),
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => Some(UserCommand::PageDown),
            (KeyCode::PageUp, _) => Some(UserCommand::PageUp),
            (KeyCode::PageDown, _) => Some(UserCommand::PageDown),

            // Help and quit
            (KeyCode::Char('?'), _) => Some(UserCommand::ShowHelp),
            (KeyCode::Char('q'), KeyModifiers::NONE) => Some(UserCommand::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(UserCommand::Quit),

            // Modal controls
            (KeyCode::Esc, _) => Some(UserCommand::Cancel),

            _ => None,
        }
    }
}

/// Event loop handle
pub struct EventLoop {
    /// Sender for events
    tx: mpsc::Sender<AppEvent>,
    /// Receiver for events
    rx: mpsc::Receiver<AppEvent>,
}

impl EventLoop {
    /// Create a new event loop
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(256);
        Self { tx, rx }
    }

    /// Get a sender for posting events
    pub fn sender(&self) -> mpsc::Sender<AppEvent> {
        self.tx.clone()
    }

    /// Start the event loop
    ///
    /// This spawns background tasks for:
    /// - Terminal input
    /// - Render ticks
    pub fn start(&mut self, tick_rate: Duration) {
        let tx = self.tx.clone();

        // Terminal input task - single long-running reader
        tokio::spawn(async move {
            let mut reader = EventStream::new();

            loop {
                let event = reader.next().fuse().await;

                match event {
                    Some(Ok(event)) => {
                        let app_event = match event {
                            CrosstermEvent::Key(key) => AppEvent::Input(InputEvent::Key(key)),
                            CrosstermEvent::Mouse(mouse) => {
                                AppEvent::Input(InputEvent::Mouse(mouse))
                            }
                            CrosstermEvent::Resize(w, h) => {
                                AppEvent::Input(InputEvent::Resize(w, h))
                            }
                            _ => continue,
                        };

                        if tx.send(app_event).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("Error reading terminal event: {}", e);
                        continue;
                    }
                    None => break,
                }
            }
        });

        // Render tick task
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_rate);

            loop {
                interval.tick().await;
                if tx.send(AppEvent::Tick).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Receive the next event
    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_to_command() {
        let key = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        assert!(matches!(
            UserCommand::from_key(key),
            Some(UserCommand::NavigateDown)
        ));

        let key = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE);
        assert!(matches!(
            UserCommand::from_key(key),
            Some(UserCommand::SplitPane)
        ));

        let key = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL);
        assert!(matches!(
            UserCommand::from_key(key),
            Some(UserCommand::ToggleTerminal)
        ));

        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(matches!(UserCommand::from_key(key), Some(UserCommand::Quit)));
    }

    #[test]
    fn test_shift_variants() {
        let key = KeyEvent::new(KeyCode::Char('H'), KeyModifiers::SHIFT);
        assert!(matches!(
            UserCommand::from_key(key),
            Some(UserCommand::MoveTabLeft)
        ));

        let key = KeyEvent::new(KeyCode::Char('N'), KeyModifiers::SHIFT);
        assert!(matches!(
            UserCommand::from_key(key),
            Some(UserCommand::NewDir)
        ));
    }

    #[test]
    fn test_unmapped_key() {
        let key = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::NONE);
        assert!(UserCommand::from_key(key).is_none());
    }
}
