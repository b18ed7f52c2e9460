//! Main TUI application
//!
//! The workspace controller: routes user gestures into the pure model
//! (workspace, multiplexer, resolver), issues asynchronous vault calls,
//! applies their responses with stale-discard, and schedules debounced
//! persistence after every state-affecting mutation.

use std::future::Future;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use super::event::{AppEvent, EventLoop, InputEvent, UserCommand, VaultEvent};
use super::theme::Theme;
use super::widgets::{
    EditorView, FileTree, FileTreeState, TabBar, TerminalView, key_to_bytes, tab_at,
};
use crate::config::{AppState, Config, SaveDebouncer};
use crate::error::{Result, TuiError};
use crate::links::LinkResolver;
use crate::render::RenderCache;
use crate::term::{PtyHost, TermEvent, TermSize, TerminalMultiplexer};
use crate::vault::{FileEntry, LocalVault, SearchHit, Vault, search};
use crate::workspace::{DragState, PaneId, TabId, Workspace, WorkspaceSnapshot};

/// Logical pixels represented by one terminal cell column
pub const CELL_LOGICAL_PX: f32 = 8.0;
/// Logical pixels represented by one terminal cell row
pub const ROW_LOGICAL_PX: f32 = 16.0;

/// Which region of the UI owns keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusRegion {
    Sidebar,
    #[default]
    Editor,
    Terminal,
}

/// Modal dialog state
#[derive(Debug, Clone)]
pub enum Modal {
    /// No modal open
    None,
    /// Text input modal
    Input {
        title: String,
        prompt: String,
        value: String,
        on_submit: InputAction,
    },
    /// Confirmation modal
    Confirm {
        title: String,
        message: String,
        on_confirm: ConfirmAction,
    },
    /// Help modal
    Help,
    /// Error modal
    Error { message: String },
    /// Search-as-you-type modal
    Search {
        query: String,
        results: Vec<SearchHit>,
        selected: usize,
    },
}

/// Action to perform when an input modal is submitted
#[derive(Debug, Clone)]
pub enum InputAction {
    NewFile,
    NewDir,
    Rename { entry: FileEntry },
}

/// Action to perform when a confirm modal is confirmed
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteEntry { entry: FileEntry },
    CreateLinkTarget { token: String },
}

/// Layout of one rendered pane, for mouse hit-testing
#[derive(Debug, Clone, Copy)]
pub struct PaneLayout {
    pub id: PaneId,
    pub area: Rect,
    pub tab_bar: Rect,
    pub content: Rect,
}

/// The rects computed by the last render, for mouse hit-testing
#[derive(Debug, Clone, Default)]
pub struct LayoutMap {
    pub window: Rect,
    pub sidebar: Rect,
    pub sidebar_inner: Rect,
    /// Column of the sidebar's draggable right border
    pub sidebar_border_x: Option<u16>,
    pub panes: Vec<PaneLayout>,
    /// (handle index, column) of the gaps between panes
    pub handles: Vec<(usize, u16)>,
    pub terminal: Rect,
    /// Row of the terminal panel's draggable top border
    pub terminal_border_y: Option<u16>,
    /// Inner output area reported to the process host as geometry
    pub terminal_output: Rect,
}

/// Application UI state
pub struct AppUiState {
    /// Focused region
    pub focus: FocusRegion,
    /// Sidebar listing state
    pub tree_state: FileTreeState,
    /// Current directory listing
    pub entries: Vec<FileEntry>,
    /// Current directory
    pub cwd: PathBuf,
    /// Generation guard for directory listings
    pub listing_generation: u64,
    /// Generation guard for debounced searches
    pub search_generation: u64,
    /// Current modal
    pub modal: Modal,
    /// Status message
    pub status_message: Option<String>,
    /// Should quit
    pub should_quit: bool,
    /// Cursor byte offset in the active editing draft
    pub edit_cursor: usize,
    /// Selected cross-reference link in the active preview
    pub link_index: Option<usize>,
    /// Rendered-preview cache
    pub render_cache: RenderCache,
    /// Hit-test rects from the last render
    pub layout: LayoutMap,
    /// Hovered drop target during a tab drag
    pub drag_hover: Option<(PaneId, TabId)>,
    /// Pointer column where the in-flight split drag began
    pub drag_origin_col: u16,
}

impl Default for AppUiState {
    fn default() -> Self {
        Self {
            focus: FocusRegion::default(),
            tree_state: FileTreeState::new(),
            entries: Vec::new(),
            cwd: PathBuf::new(),
            listing_generation: 0,
            search_generation: 0,
            modal: Modal::None,
            status_message: None,
            should_quit: false,
            edit_cursor: 0,
            link_index: None,
            render_cache: RenderCache::new(),
            layout: LayoutMap::default(),
            drag_hover: None,
            drag_origin_col: 0,
        }
    }
}

/// Main TUI application
pub struct App {
    /// Configuration
    config: Config,
    /// Theme
    theme: Theme,
    /// Persisted state (shared with the save task)
    app_state: Arc<RwLock<AppState>>,
    /// Debounced state writer
    saver: SaveDebouncer,
    /// File backend
    vault: Arc<dyn Vault>,
    /// Vault root directory
    vault_root: PathBuf,
    /// The workspace model
    workspace: Workspace,
    /// Cross-reference resolver
    resolver: LinkResolver,
    /// Terminal multiplexer
    mux: TerminalMultiplexer,
    /// Event loop
    event_loop: EventLoop,
    /// UI state
    ui: AppUiState,
}

impl App {
    /// Create a new application
    pub fn new(config: Config, app_state: AppState, vault_root: PathBuf) -> Self {
        let theme = Theme::from_name(app_state.theme.as_deref());
        let app_state = Arc::new(RwLock::new(app_state));
        let saver = SaveDebouncer::spawn(
            app_state.clone(),
            Duration::from_millis(config.save_debounce_ms),
        );

        let event_loop = EventLoop::new();

        // Terminal output flows host -> channel -> event loop
        let (term_tx, mut term_rx) = mpsc::channel::<TermEvent>(256);
        let host = Arc::new(PtyHost::new(term_tx));
        let forward = event_loop.sender();
        tokio::spawn(async move {
            while let Some(event) = term_rx.recv().await {
                if forward.send(AppEvent::Term(event)).await.is_err() {
                    break;
                }
            }
        });

        let mux = TerminalMultiplexer::new(host, config.shell_program.clone());

        let mut ui = AppUiState::default();
        ui.cwd = vault_root.clone();

        Self {
            config,
            theme,
            app_state,
            saver,
            vault: Arc::new(LocalVault::new()),
            vault_root,
            workspace: Workspace::new(),
            resolver: LinkResolver::new(),
            mux,
            event_loop,
            ui,
        }
    }

    /// Run the application
    pub async fn run(&mut self) -> Result<()> {
        self.restore_workspace().await;
        self.refresh_listing();

        let tick_rate = Duration::from_millis(1000 / self.config.ui_refresh_fps.max(1) as u64);
        self.event_loop.start(tick_rate);

        let mut terminal = self.setup_terminal()?;
        info!("Entering main loop");
        let result = self.main_loop(&mut terminal).await;
        self.restore_terminal(&mut terminal)?;

        // Final write so nothing rides on the debounce window
        self.persist().await;
        self.saver.flush().await;

        result
    }

    /// Rebuild the workspace from the persisted snapshot, falling back to
    /// a single fresh empty pane, and issue the content loads.
    async fn restore_workspace(&mut self) {
        let state = self.app_state.read().await;

        let (workspace, loads) = match &state.workspace {
            Some(snapshot) => snapshot.restore(),
            None => (Workspace::new(), Vec::new()),
        };
        self.workspace = workspace;

        self.workspace.sidebar.visible = state.sidebar_visible;
        self.workspace.terminal_panel.height = state.terminal_height;
        self.workspace.terminal_panel.visible = state.terminal_visible;
        self.workspace.set_zoom(state.zoom);
        drop(state);

        info!(
            "restored workspace: {} panes, {} pending loads",
            self.workspace.pane_count(),
            loads.len()
        );

        for load in loads {
            self.load_tab(load.pane, load.tab, PathBuf::from(load.target));
        }
    }

    // ------------------------------------------------------------------
    // Async backend round-trips
    // ------------------------------------------------------------------

    /// Refresh the sidebar listing (and the link cache) for the current
    /// directory.
    fn refresh_listing(&mut self) {
        self.ui.listing_generation += 1;
        let generation = self.ui.listing_generation;
        let dir = self.ui.cwd.clone();
        let vault = self.vault.clone();
        let tx = self.event_loop.sender();

        tokio::spawn(async move {
            let result = vault.list(&dir).await.map_err(|e| e.to_string());
            let _ = tx
                .send(AppEvent::Vault(VaultEvent::DirListed {
                    generation,
                    dir,
                    result,
                }))
                .await;
        });
    }

    /// Issue the content read for a tab
    fn load_tab(&self, pane: PaneId, tab: TabId, target: PathBuf) {
        let vault = self.vault.clone();
        let tx = self.event_loop.sender();

        tokio::spawn(async move {
            let result = vault.read(&target).await.map_err(|e| e.to_string());
            let _ = tx
                .send(AppEvent::Vault(VaultEvent::FileLoaded { pane, tab, result }))
                .await;
        });
    }

    /// Issue the save write for the active tab's draft
    fn save_active_tab(&mut self) {
        let pane_id = self.workspace.active_id();
        let Some(tab) = self.workspace.active_pane().active_tab() else {
            return;
        };
        let Some(draft) = tab.draft() else {
            return;
        };

        let tab_id = tab.id;
        let path = PathBuf::from(&tab.target);
        let text = draft.to_string();
        let vault = self.vault.clone();
        let tx = self.event_loop.sender();

        tokio::spawn(async move {
            let result = vault.write(&path, &text).await.map_err(|e| e.to_string());
            let _ = tx
                .send(AppEvent::Vault(VaultEvent::FileSaved {
                    pane: pane_id,
                    tab: tab_id,
                    text,
                    result,
                }))
                .await;
        });
    }

    /// Run a create/rename/delete mutation in the background
    fn spawn_mutation(
        &self,
        action: &'static str,
        open: Option<FileEntry>,
        fut: impl Future<Output = Result<()>> + Send + 'static,
    ) {
        let tx = self.event_loop.sender();
        tokio::spawn(async move {
            let result = fut.await.map_err(|e| e.to_string());
            let _ = tx
                .send(AppEvent::Vault(VaultEvent::MutationDone {
                    action: action.to_string(),
                    result,
                    open,
                }))
                .await;
        });
    }

    /// Schedule a debounced search for the current query. Superseded
    /// queries are discarded by generation when their results arrive.
    fn schedule_search(&mut self, query: String) {
        self.ui.search_generation += 1;
        let generation = self.ui.search_generation;
        let root = self.vault_root.clone();
        let delay = Duration::from_millis(self.config.search_debounce_ms);
        let tx = self.event_loop.sender();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = search(root, &query).await.map_err(|e| e.to_string());
            let _ = tx
                .send(AppEvent::Vault(VaultEvent::SearchResults { generation, result }))
                .await;
        });
    }

    /// Capture the workspace into shared state and schedule a debounced
    /// write. Called after every state-affecting mutation.
    async fn persist(&mut self) {
        let snapshot = WorkspaceSnapshot::capture(&self.workspace);
        {
            let mut state = self.app_state.write().await;
            state.workspace = Some(snapshot);
            state.sidebar_width = self.workspace.sidebar.width;
            state.sidebar_visible = self.workspace.sidebar.visible;
            state.zoom = self.workspace.zoom();
            state.terminal_height = self.workspace.terminal_panel.height;
            state.terminal_visible = self.workspace.terminal_panel.visible;
            state.last_vault = Some(self.vault_root.clone());
        }
        self.saver.schedule();
    }

    // ------------------------------------------------------------------
    // Terminal setup / teardown
    // ------------------------------------------------------------------

    fn setup_terminal(&self) -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode().map_err(|e| TuiError::InitFailed(e.to_string()))?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .map_err(|e| TuiError::InitFailed(e.to_string()))?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).map_err(|e| TuiError::InitFailed(e.to_string()))?;

        Ok(terminal)
    }

    fn restore_terminal(&self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        disable_raw_mode().map_err(|e| TuiError::RestoreFailed(e.to_string()))?;

        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )
        .map_err(|e| TuiError::RestoreFailed(e.to_string()))?;

        terminal
            .show_cursor()
            .map_err(|e| TuiError::RestoreFailed(e.to_string()))?;

        Ok(())
    }

    /// Main event loop
    async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal
                .draw(|f| self.render(f))
                .map_err(|e| TuiError::RenderError(e.to_string()))?;

            // Geometry depends on the layout the draw just computed
            self.sync_terminal_geometry().await;

            if let Some(event) = self.event_loop.next().await {
                match event {
                    AppEvent::Input(input) => self.handle_input(input).await,
                    AppEvent::Vault(event) => self.handle_vault_event(event).await,
                    AppEvent::Term(event) => self.mux.apply_event(event),
                    AppEvent::Tick => {}
                    AppEvent::Quit => self.ui.should_quit = true,
                }
            }

            if self.ui.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Report the rendered output area to the active session's process
    async fn sync_terminal_geometry(&mut self) {
        let output = self.ui.layout.terminal_output;
        if output.width == 0 || output.height == 0 {
            return;
        }
        let size = TermSize::new(output.height, output.width);
        if let Err(e) = self.mux.sync_active_geometry(size).await {
            debug!("terminal geometry sync failed: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Input handling
    // ------------------------------------------------------------------

    async fn handle_input(&mut self, input: InputEvent) {
        match input {
            InputEvent::Key(key) => {
                if key.kind == KeyEventKind::Release {
                    return;
                }

                if !matches!(self.ui.modal, Modal::None) {
                    self.handle_modal_key(key).await;
                    return;
                }

                if self.ui.focus == FocusRegion::Terminal
                    && self.workspace.terminal_panel.visible
                    && self.handle_terminal_key(key).await
                {
                    return;
                }

                if self.ui.focus == FocusRegion::Editor
                    && self
                        .workspace
                        .active_pane()
                        .active_tab()
                        .is_some_and(|t| t.mode.is_editing())
                {
                    self.handle_edit_key(key).await;
                    return;
                }

                if let Some(cmd) = UserCommand::from_key(key) {
                    self.handle_command(cmd).await;
                }
            }
            InputEvent::Mouse(mouse) => self.handle_mouse(mouse).await,
            InputEvent::Resize(_, _) => {
                // The next draw recomputes the layout
            }
        }
    }

    /// Keys while the terminal panel is focused. Returns true when the key
    /// was consumed (forwarded or handled); false falls through to browse
    /// commands (e.g. when no session can take input).
    async fn handle_terminal_key(&mut self, key: KeyEvent) -> bool {
        match (key.code, key.modifiers) {
            // Leave terminal focus
            (KeyCode::Char('q'), KeyModifiers::CONTROL) => {
                self.ui.focus = FocusRegion::Editor;
                return true;
            }
            (KeyCode::Char('j'), KeyModifiers::CONTROL) => {
                self.workspace.toggle_terminal_panel();
                self.ui.focus = FocusRegion::Editor;
                self.persist().await;
                return true;
            }
            _ => {}
        }

        let Some(bytes) = key_to_bytes(key) else {
            return true;
        };
        let Some(id) = self.mux.active_id() else {
            return false;
        };

        match self.mux.send_input(id, &bytes).await {
            Ok(()) => true,
            Err(e) => {
                debug!("terminal input dropped: {}", e);
                false
            }
        }
    }

    /// Keys while the active tab is in editing mode
    async fn handle_edit_key(&mut self, key: KeyEvent) {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => {
                if let Some(tab) = self.workspace.active_pane_mut().active_tab_mut() {
                    tab.cancel_edit();
                }
                self.ui.status_message = Some("Edit cancelled (draft kept)".to_string());
                return;
            }
            (KeyCode::Char('s'), KeyModifiers::CONTROL) => {
                self.save_active_tab();
                return;
            }
            // Insert the completion for an open [[ token
            (KeyCode::Char('l'), KeyModifiers::CONTROL) => {
                self.complete_wiki_link();
                return;
            }
            _ => {}
        }

        let Some(tab) = self.workspace.active_pane_mut().active_tab_mut() else {
            return;
        };
        let draft_len = tab.draft().map(str::len).unwrap_or(0);
        // The cursor can be stale after focus moved between editing tabs
        let cursor = tab
            .draft()
            .map(|d| snap_to_boundary(d, self.ui.edit_cursor))
            .unwrap_or(0);

        match (key.code, key.modifiers) {
            (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => {
                tab.edit_draft(|d| d.insert(cursor, c));
                self.ui.edit_cursor = cursor + c.len_utf8();
            }
            (KeyCode::Enter, _) => {
                tab.edit_draft(|d| d.insert(cursor, '\n'));
                self.ui.edit_cursor = cursor + 1;
            }
            (KeyCode::Tab, _) => {
                tab.edit_draft(|d| d.insert_str(cursor, "  "));
                self.ui.edit_cursor = cursor + 2;
            }
            (KeyCode::Backspace, _) => {
                if let Some(draft) = tab.draft() {
                    if let Some(prev) = prev_char_start(draft, cursor) {
                        tab.edit_draft(|d| {
                            d.remove(prev);
                        });
                        self.ui.edit_cursor = prev;
                    }
                }
            }
            (KeyCode::Delete, _) => {
                if cursor < draft_len {
                    tab.edit_draft(|d| {
                        d.remove(cursor);
                    });
                }
            }
            (KeyCode::Left, _) => {
                if let Some(draft) = tab.draft() {
                    if let Some(prev) = prev_char_start(draft, cursor) {
                        self.ui.edit_cursor = prev;
                    }
                }
            }
            (KeyCode::Right, _) => {
                if let Some(draft) = tab.draft() {
                    self.ui.edit_cursor = next_char_end(draft, cursor);
                }
            }
            (KeyCode::Up, _) => {
                if let Some(draft) = tab.draft() {
                    self.ui.edit_cursor = move_vertical(draft, cursor, -1);
                }
            }
            (KeyCode::Down, _) => {
                if let Some(draft) = tab.draft() {
                    self.ui.edit_cursor = move_vertical(draft, cursor, 1);
                }
            }
            (KeyCode::Home, _) => {
                if let Some(draft) = tab.draft() {
                    self.ui.edit_cursor = line_start(draft, cursor);
                }
            }
            (KeyCode::End, _) => {
                if let Some(draft) = tab.draft() {
                    self.ui.edit_cursor = line_end(draft, cursor);
                }
            }
            _ => {}
        }
    }

    /// Insert the first autocomplete candidate for an open `[[` token
    fn complete_wiki_link(&mut self) {
        let cursor = self.ui.edit_cursor;
        let Some(tab) = self.workspace.active_pane_mut().active_tab_mut() else {
            return;
        };
        let Some(draft) = tab.draft() else {
            return;
        };
        let Some((start, prefix)) = open_token_prefix(draft, snap_to_boundary(draft, cursor)) else {
            self.ui.status_message = Some("No open [[ token at cursor".to_string());
            return;
        };

        let candidates = self.resolver.completions(&prefix);
        let Some(candidate) = candidates.first() else {
            self.ui.status_message = Some(format!("No completion for [[{prefix}"));
            return;
        };

        let replacement = format!("{candidate}]]");
        let prefix_len = prefix.len();
        tab.edit_draft(|d| {
            d.replace_range(start..start + prefix_len, "");
            d.insert_str(start, &replacement);
        });
        self.ui.edit_cursor = start + replacement.len();
    }

    /// Browse-mode commands
    async fn handle_command(&mut self, cmd: UserCommand) {
        match cmd {
            UserCommand::NavigateUp => match self.ui.focus {
                FocusRegion::Sidebar => self.ui.tree_state.previous(),
                FocusRegion::Editor => self.scroll_active_tab(-1).await,
                FocusRegion::Terminal => {}
            },
            UserCommand::NavigateDown => match self.ui.focus {
                FocusRegion::Sidebar => self.ui.tree_state.next(),
                FocusRegion::Editor => self.scroll_active_tab(1).await,
                FocusRegion::Terminal => {}
            },
            UserCommand::Select => match self.ui.focus {
                FocusRegion::Sidebar => self.open_selected_entry().await,
                FocusRegion::Editor => self.follow_selected_link().await,
                FocusRegion::Terminal => {}
            },
            UserCommand::ParentDir => {
                if self.ui.focus == FocusRegion::Sidebar && self.ui.cwd != self.vault_root {
                    if let Some(parent) = self.ui.cwd.parent() {
                        self.ui.cwd = parent.to_path_buf();
                        self.refresh_listing();
                    }
                }
            }
            UserCommand::FocusNext => self.cycle_focus(),

            UserCommand::NewFile => {
                self.ui.modal = Modal::Input {
                    title: "New File".to_string(),
                    prompt: "Enter new file name:".to_string(),
                    value: String::new(),
                    on_submit: InputAction::NewFile,
                };
            }
            UserCommand::NewDir => {
                self.ui.modal = Modal::Input {
                    title: "New Folder".to_string(),
                    prompt: "Enter new folder name:".to_string(),
                    value: String::new(),
                    on_submit: InputAction::NewDir,
                };
            }
            UserCommand::RenameEntry => {
                if let Some(entry) = self.selected_entry() {
                    self.ui.modal = Modal::Input {
                        title: "Rename".to_string(),
                        prompt: format!("Rename '{}' to:", entry.name),
                        value: entry.name.clone(),
                        on_submit: InputAction::Rename { entry },
                    };
                }
            }
            UserCommand::DeleteEntry => {
                if let Some(entry) = self.selected_entry() {
                    self.ui.modal = Modal::Confirm {
                        title: "Delete".to_string(),
                        message: format!("Delete \"{}\"?", entry.name),
                        on_confirm: ConfirmAction::DeleteEntry { entry },
                    };
                }
            }
            UserCommand::OpenSearch => {
                self.ui.modal = Modal::Search {
                    query: String::new(),
                    results: Vec::new(),
                    selected: 0,
                };
            }

            UserCommand::ToggleSidebar => {
                self.workspace.toggle_sidebar();
                if !self.workspace.sidebar.visible && self.ui.focus == FocusRegion::Sidebar {
                    self.ui.focus = FocusRegion::Editor;
                }
                self.persist().await;
            }
            UserCommand::ToggleTerminal => {
                self.workspace.toggle_terminal_panel();
                if self.workspace.terminal_panel.visible {
                    self.ui.focus = FocusRegion::Terminal;
                } else if self.ui.focus == FocusRegion::Terminal {
                    self.ui.focus = FocusRegion::Editor;
                }
                self.persist().await;
            }
            UserCommand::NewTerminal => {
                let size = self.current_term_size();
                self.mux.create_session(None, size).await;
                self.workspace.terminal_panel.visible = true;
                self.ui.focus = FocusRegion::Terminal;
                self.persist().await;
            }
            UserCommand::NextTerminal => self.mux.activate_next(),
            UserCommand::CloseTerminal => {
                if let Some(id) = self.mux.active_id() {
                    if let Err(e) = self.mux.close_session(id).await {
                        warn!("failed to close terminal session: {}", e);
                    }
                }
            }

            UserCommand::SplitPane => {
                self.workspace.add_pane();
                self.ui.focus = FocusRegion::Editor;
                self.persist().await;
            }
            UserCommand::ClosePane => {
                let id = self.workspace.active_id();
                let closed_tabs: Vec<TabId> = self
                    .workspace
                    .pane(id)
                    .map(|p| p.tab_order().to_vec())
                    .unwrap_or_default();
                if self.workspace.remove_pane(id).is_ok() {
                    for tab in closed_tabs {
                        self.ui.render_cache.forget(tab);
                    }
                    self.persist().await;
                }
            }
            UserCommand::NextPane => {
                let order = self.workspace.pane_order();
                if let Some(pos) = order.iter().position(|p| *p == self.workspace.active_id()) {
                    let next = order[(pos + 1) % order.len()];
                    let _ = self.workspace.set_active(next);
                    self.ui.focus = FocusRegion::Editor;
                }
            }
            UserCommand::PrevTab | UserCommand::NextTab => {
                self.switch_tab_relative(if cmd == UserCommand::PrevTab { -1 } else { 1 })
                    .await;
            }
            UserCommand::MoveTabLeft | UserCommand::MoveTabRight => {
                let delta: isize = if cmd == UserCommand::MoveTabLeft { -1 } else { 1 };
                let pane = self.workspace.active_pane_mut();
                if let Some(active) = pane.active_id() {
                    if let Some(index) = pane.index_of(active) {
                        let to = index.saturating_add_signed(delta);
                        if pane.move_tab(active, to) {
                            self.persist().await;
                        }
                    }
                }
            }
            UserCommand::CloseTab => {
                let pane = self.workspace.active_pane_mut();
                if let Some(active) = pane.active_id() {
                    pane.close_tab(active);
                    self.ui.render_cache.forget(active);
                    self.ui.link_index = None;
                    self.persist().await;
                }
            }

            UserCommand::EditMode => {
                if let Some(tab) = self.workspace.active_pane_mut().active_tab_mut() {
                    tab.begin_edit();
                    self.ui.edit_cursor = tab.draft().map(str::len).unwrap_or(0);
                    self.ui.focus = FocusRegion::Editor;
                }
            }
            UserCommand::NextLink => self.select_next_link(),
            UserCommand::OpenInEditor => self.open_in_external_editor().await,

            UserCommand::ZoomIn => {
                let zoom = self.workspace.zoom() + 0.1;
                self.workspace.set_zoom(zoom);
                self.persist().await;
            }
            UserCommand::ZoomOut => {
                let zoom = self.workspace.zoom() - 0.1;
                self.workspace.set_zoom(zoom);
                self.persist().await;
            }
            UserCommand::PageUp => self.page_focused(-1).await,
            UserCommand::PageDown => self.page_focused(1).await,

            UserCommand::ShowHelp => self.ui.modal = Modal::Help,
            UserCommand::Quit => self.ui.should_quit = true,
            UserCommand::Cancel => {
                self.ui.status_message = None;
                self.ui.link_index = None;
            }
        }
    }

    fn cycle_focus(&mut self) {
        let sidebar = self.workspace.sidebar.visible;
        let terminal = self.workspace.terminal_panel.visible;
        self.ui.focus = match self.ui.focus {
            FocusRegion::Sidebar => FocusRegion::Editor,
            FocusRegion::Editor if terminal => FocusRegion::Terminal,
            FocusRegion::Editor if sidebar => FocusRegion::Sidebar,
            FocusRegion::Editor => FocusRegion::Editor,
            FocusRegion::Terminal if sidebar => FocusRegion::Sidebar,
            FocusRegion::Terminal => FocusRegion::Editor,
        };
    }

    fn selected_entry(&self) -> Option<FileEntry> {
        let index = self.ui.tree_state.selected()?;
        self.ui.entries.get(index).cloned()
    }

    async fn open_selected_entry(&mut self) {
        if let Some(entry) = self.selected_entry() {
            self.open_entry(entry).await;
        }
    }

    /// Open a vault entry: descend into directories, open files as tabs
    async fn open_entry(&mut self, entry: FileEntry) {
        if entry.is_dir {
            self.ui.cwd = entry.path;
            self.refresh_listing();
            return;
        }

        let target = entry.path.to_string_lossy().into_owned();
        let (pane, tab, created) = self.workspace.open_in_active(entry.name, target);
        if created {
            self.load_tab(pane, tab, entry.path);
        }
        self.ui.link_index = None;
        self.ui.focus = FocusRegion::Editor;
        self.persist().await;
    }

    async fn scroll_active_tab(&mut self, delta: i32) {
        if let Some(tab) = self.workspace.active_pane_mut().active_tab_mut() {
            tab.scroll_offset = tab.scroll_offset.saturating_add_signed(delta as i16);
            self.persist().await;
        }
    }

    async fn page_focused(&mut self, direction: i32) {
        match self.ui.focus {
            FocusRegion::Editor => {
                let page = self
                    .ui
                    .layout
                    .panes
                    .first()
                    .map(|p| p.content.height.saturating_sub(2).max(1))
                    .unwrap_or(10) as i32;
                self.scroll_active_tab(direction * page).await;
            }
            FocusRegion::Sidebar => {
                for _ in 0..10 {
                    if direction < 0 {
                        self.ui.tree_state.previous();
                    } else {
                        self.ui.tree_state.next();
                    }
                }
            }
            FocusRegion::Terminal => {}
        }
    }

    async fn switch_tab_relative(&mut self, delta: isize) {
        let pane = self.workspace.active_pane_mut();
        let order = pane.tab_order().to_vec();
        if order.is_empty() {
            return;
        }
        let current = pane
            .active_id()
            .and_then(|id| order.iter().position(|t| *t == id))
            .unwrap_or(0);
        let next = (current as isize + delta).rem_euclid(order.len() as isize) as usize;
        pane.switch_to(order[next]);
        self.ui.link_index = None;
        self.persist().await;
    }

    fn select_next_link(&mut self) {
        let Some(tab) = self.workspace.active_pane().active_tab() else {
            return;
        };
        if tab.mode.is_editing() {
            return;
        }
        let count = self.resolver.links_in(&tab.content_cache).len();
        if count == 0 {
            self.ui.status_message = Some("No links in this document".to_string());
            self.ui.link_index = None;
            return;
        }
        self.ui.link_index = Some(match self.ui.link_index {
            Some(i) => (i + 1) % count,
            None => 0,
        });
    }

    /// Follow the selected cross-reference: open its target, or offer to
    /// create the missing document.
    async fn follow_selected_link(&mut self) {
        let Some(index) = self.ui.link_index else {
            return;
        };
        let Some(tab) = self.workspace.active_pane().active_tab() else {
            return;
        };

        let token = {
            let links = self.resolver.links_in(&tab.content_cache);
            match links.get(index) {
                Some(link) => link.token.clone(),
                None => return,
            }
        };

        match self.resolver.resolve(&token).cloned() {
            Some(entry) => self.open_entry(entry).await,
            None => {
                let name = LinkResolver::creation_name(&token);
                self.ui.modal = Modal::Confirm {
                    title: "Create Note".to_string(),
                    message: format!("\"{name}\" does not exist. Create it?"),
                    on_confirm: ConfirmAction::CreateLinkTarget { token },
                };
            }
        }
    }

    /// Open the active document in the configured line-mode editor inside
    /// a terminal session, creating one when none is usable.
    async fn open_in_external_editor(&mut self) {
        let Some(editor) = self.config.resolve_editor() else {
            self.ui.status_message =
                Some("No editor configured (set editor in config, or $EDITOR)".to_string());
            return;
        };
        let Some(tab) = self.workspace.active_pane().active_tab() else {
            return;
        };
        let target = tab.target.clone();

        self.workspace.terminal_panel.visible = true;
        let size = self.current_term_size();
        self.mux.ensure_active_session(size).await;

        let command = format!("{} '{}'", editor, target.replace('\'', r"'\''"));
        match self.mux.send_line_to_active(&command).await {
            Ok(()) => {
                self.ui.focus = FocusRegion::Terminal;
            }
            Err(e) => {
                self.ui.modal = Modal::Error {
                    message: format!("Cannot launch editor: {e}"),
                };
            }
        }
        self.persist().await;
    }

    fn current_term_size(&self) -> TermSize {
        let output = self.ui.layout.terminal_output;
        if output.width > 0 && output.height > 0 {
            TermSize::new(output.height, output.width)
        } else {
            TermSize::default()
        }
    }

    // ------------------------------------------------------------------
    // Modal handling
    // ------------------------------------------------------------------

    async fn handle_modal_key(&mut self, key: KeyEvent) {
        match &mut self.ui.modal {
            Modal::Input {
                value, on_submit, ..
            } => match key.code {
                KeyCode::Enter => {
                    let action = on_submit.clone();
                    let value = value.clone();
                    self.ui.modal = Modal::None;
                    self.handle_input_submit(action, value).await;
                }
                KeyCode::Esc => self.ui.modal = Modal::None,
                KeyCode::Backspace => {
                    value.pop();
                }
                KeyCode::Char(c) => value.push(c),
                _ => {}
            },

            Modal::Confirm { on_confirm, .. } => match key.code {
                KeyCode::Enter => {
                    let action = on_confirm.clone();
                    self.ui.modal = Modal::None;
                    self.handle_confirm(action).await;
                }
                KeyCode::Esc => {
                    // Declining is not an error and mutates nothing
                    self.ui.modal = Modal::None;
                }
                _ => {}
            },

            Modal::Search {
                query,
                results,
                selected,
            } => match key.code {
                KeyCode::Esc => self.ui.modal = Modal::None,
                KeyCode::Up => *selected = selected.saturating_sub(1),
                KeyCode::Down => {
                    if *selected + 1 < results.len() {
                        *selected += 1;
                    }
                }
                KeyCode::Enter => {
                    if let Some(hit) = results.get(*selected) {
                        let entry = hit.entry.clone();
                        self.ui.modal = Modal::None;
                        self.open_entry(entry).await;
                    }
                }
                KeyCode::Backspace => {
                    query.pop();
                    let q = query.clone();
                    self.schedule_search(q);
                }
                KeyCode::Char(c) => {
                    query.push(c);
                    let q = query.clone();
                    self.schedule_search(q);
                }
                _ => {}
            },

            Modal::Help | Modal::Error { .. } => {
                // Any key closes help/error
                self.ui.modal = Modal::None;
            }

            Modal::None => {}
        }
    }

    async fn handle_input_submit(&mut self, action: InputAction, value: String) {
        let name = value.trim().to_string();
        if name.is_empty() {
            self.ui.status_message = Some("Name cannot be empty".to_string());
            return;
        }

        match action {
            InputAction::NewFile => {
                let path = self.ui.cwd.join(&name);
                let entry = FileEntry::new(name, path.clone(), false);
                let vault = self.vault.clone();
                self.spawn_mutation("create file", Some(entry), async move {
                    vault.create_file(&path).await
                });
            }
            InputAction::NewDir => {
                let path = self.ui.cwd.join(&name);
                let vault = self.vault.clone();
                self.spawn_mutation("create folder", None, async move {
                    vault.create_dir(&path).await
                });
            }
            InputAction::Rename { entry } => {
                if name == entry.name {
                    return;
                }
                let new_path = entry
                    .path
                    .parent()
                    .map(|p| p.join(&name))
                    .unwrap_or_else(|| PathBuf::from(&name));
                let vault = self.vault.clone();
                let old_path = entry.path.clone();
                self.spawn_mutation("rename", None, async move {
                    vault.rename(&old_path, &new_path).await
                });
            }
        }
    }

    async fn handle_confirm(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeleteEntry { entry } => {
                let vault = self.vault.clone();
                let path = entry.path.clone();
                self.spawn_mutation("delete", None, async move { vault.delete(&path).await });
            }
            ConfirmAction::CreateLinkTarget { token } => {
                let name = LinkResolver::creation_name(&token);
                let path = self.ui.cwd.join(&name);
                let entry = FileEntry::new(name, path.clone(), false);
                let vault = self.vault.clone();
                self.spawn_mutation("create note", Some(entry), async move {
                    vault.create_file(&path).await
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Vault responses
    // ------------------------------------------------------------------

    async fn handle_vault_event(&mut self, event: VaultEvent) {
        match event {
            VaultEvent::DirListed {
                generation,
                dir,
                result,
            } => {
                if generation != self.ui.listing_generation {
                    debug!("dropping superseded listing for {:?}", dir);
                    return;
                }
                match result {
                    Ok(entries) => {
                        self.ui.tree_state.set_item_count(entries.len());
                        if self.ui.tree_state.selected().is_none() && !entries.is_empty() {
                            self.ui.tree_state.select(Some(0));
                        }
                        self.resolver.update_cache(entries.clone());
                        self.ui.entries = entries;
                    }
                    Err(e) => {
                        self.ui.entries.clear();
                        self.ui.tree_state.set_item_count(0);
                        self.ui.status_message = Some(format!("Cannot list directory: {e}"));
                    }
                }
            }

            VaultEvent::FileLoaded { pane, tab, result } => {
                let applied = self
                    .workspace
                    .pane_mut(pane)
                    .is_some_and(|p| p.apply_loaded(tab, result));
                if !applied {
                    debug!("dropping stale load for closed tab {}", tab);
                }
            }

            VaultEvent::FileSaved {
                pane,
                tab,
                text,
                result,
            } => match result {
                Ok(()) => {
                    let applied = self
                        .workspace
                        .pane_mut(pane)
                        .is_some_and(|p| p.apply_saved(tab, text));
                    if applied {
                        self.ui.status_message = Some("Saved".to_string());
                    } else {
                        debug!("dropping stale save ack for tab {}", tab);
                    }
                }
                Err(e) => {
                    // The draft stays in editing mode; nothing is lost
                    self.ui.modal = Modal::Error {
                        message: format!("Save failed: {e}"),
                    };
                }
            },

            VaultEvent::MutationDone {
                action,
                result,
                open,
            } => match result {
                Ok(()) => {
                    self.ui.status_message = Some(format!("{action}: done"));
                    self.refresh_listing();
                    if let Some(entry) = open {
                        self.open_entry(entry).await;
                    }
                }
                Err(e) => {
                    self.ui.modal = Modal::Error {
                        message: format!("Failed to {action}: {e}"),
                    };
                }
            },

            VaultEvent::SearchResults { generation, result } => {
                if generation != self.ui.search_generation {
                    debug!("dropping superseded search results");
                    return;
                }
                if let Modal::Search {
                    results, selected, ..
                } = &mut self.ui.modal
                {
                    match result {
                        Ok(hits) => {
                            *results = hits;
                            *selected = (*selected).min(results.len().saturating_sub(1));
                        }
                        Err(e) => {
                            self.ui.status_message = Some(format!("Search failed: {e}"));
                        }
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Mouse handling
    // ------------------------------------------------------------------

    async fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.mouse_down(mouse.column, mouse.row).await;
            }
            MouseEventKind::Drag(MouseButton::Left) => self.mouse_drag(mouse.column, mouse.row),
            MouseEventKind::Up(MouseButton::Left) => self.mouse_up(mouse.column, mouse.row).await,
            MouseEventKind::ScrollUp => self.mouse_scroll(mouse.column, mouse.row, -3).await,
            MouseEventKind::ScrollDown => self.mouse_scroll(mouse.column, mouse.row, 3).await,
            _ => {}
        }
    }

    async fn mouse_down(&mut self, column: u16, row: u16) {
        let layout = self.ui.layout.clone();

        // Sidebar resize handle
        if layout.sidebar_border_x == Some(column) {
            let _ = self.workspace.begin_sidebar_resize();
            return;
        }

        // Terminal panel resize handle
        if layout.terminal_border_y == Some(row) {
            let _ = self.workspace.begin_terminal_resize();
            return;
        }

        // Split handles between panes
        for (handle, x) in &layout.handles {
            if *x == column && layout.panes.first().is_some_and(|p| p.area.contains_row(row)) {
                let left = layout.panes[*handle].area.width as f32 * CELL_LOGICAL_PX;
                let right = layout.panes[handle + 1].area.width as f32 * CELL_LOGICAL_PX;
                if self.workspace.begin_split_resize(*handle, left, right).is_ok() {
                    self.ui.drag_origin_col = column;
                }
                return;
            }
        }

        // Pane tab bars and content
        for pane in &layout.panes {
            if pane.tab_bar.contains_point(column, row) {
                let _ = self.workspace.set_active(pane.id);
                self.ui.focus = FocusRegion::Editor;

                let strip_col = column - pane.tab_bar.x;
                let hit = self
                    .workspace
                    .pane(pane.id)
                    .and_then(|p| tab_at(p, pane.tab_bar.width, strip_col));
                if let Some(tab) = hit {
                    if let Some(p) = self.workspace.pane_mut(pane.id) {
                        p.switch_to(tab);
                    }
                    self.ui.link_index = None;
                    // Picked up for a possible drag; a plain click drops
                    // on itself, which mutates nothing
                    let _ = self.workspace.begin_tab_drag(pane.id, tab);
                    self.persist().await;
                }
                return;
            }
            if pane.content.contains_point(column, row) {
                let _ = self.workspace.set_active(pane.id);
                self.ui.focus = FocusRegion::Editor;
                return;
            }
        }

        // Sidebar entries: click selects and opens, like the tree list
        if layout.sidebar_inner.contains_point(column, row) {
            let offset = self.ui.tree_state.list_state.offset();
            let index = offset + (row - layout.sidebar_inner.y) as usize;
            if index < self.ui.entries.len() {
                self.ui.tree_state.select(Some(index));
                self.ui.focus = FocusRegion::Sidebar;
                self.open_selected_entry().await;
            }
            return;
        }

        if layout.terminal.contains_point(column, row) {
            self.ui.focus = FocusRegion::Terminal;
        }
    }

    fn mouse_drag(&mut self, column: u16, row: u16) {
        match self.workspace.drag().clone() {
            DragState::Split { .. } => {
                // Pointer deltas arrive in cells, which are already
                // zoom-independent; pre-scale so the model's zoom division
                // cancels out.
                let delta_cells = column as f32 - self.ui.drag_origin_col as f32;
                let raw = delta_cells * CELL_LOGICAL_PX * self.workspace.zoom();
                self.workspace.split_resize_by(raw);
            }
            DragState::Sidebar => {
                let logical = column as f32 * CELL_LOGICAL_PX;
                self.workspace.sidebar_resize_to(logical);
            }
            DragState::TerminalPanel => {
                let window = self.ui.layout.window;
                let rows_from_bottom = window.bottom().saturating_sub(row).saturating_sub(1);
                self.workspace.terminal_resize_to(
                    rows_from_bottom as f32 * ROW_LOGICAL_PX,
                    window.height as f32 * ROW_LOGICAL_PX,
                );
            }
            DragState::Tab { .. } => {
                // Drag-over applies a visual affordance only
                self.ui.drag_hover = self.tab_under(column, row);
            }
            DragState::Idle => {}
        }
    }

    async fn mouse_up(&mut self, column: u16, row: u16) {
        match self.workspace.drag().clone() {
            DragState::Tab { .. } => {
                let target = self.tab_under(column, row);
                self.ui.drag_hover = None;
                match target {
                    Some((pane, tab)) => {
                        if self.workspace.complete_tab_drag(pane, tab) {
                            self.persist().await;
                        }
                    }
                    None => {
                        // Abandoned drag: no drop target registered
                        self.workspace.cancel_gesture();
                    }
                }
            }
            DragState::Idle => {}
            _ => {
                // Resize gestures commit a save on gesture end only
                if self.workspace.end_gesture() {
                    self.persist().await;
                }
            }
        }
    }

    async fn mouse_scroll(&mut self, column: u16, row: u16, delta: i32) {
        let layout = self.ui.layout.clone();

        for pane in &layout.panes {
            if pane.content.contains_point(column, row) {
                if self.workspace.active_id() != pane.id {
                    let _ = self.workspace.set_active(pane.id);
                }
                self.scroll_active_tab(delta).await;
                return;
            }
        }

        if layout.sidebar_inner.contains_point(column, row) {
            for _ in 0..delta.unsigned_abs() {
                if delta < 0 {
                    self.ui.tree_state.previous();
                } else {
                    self.ui.tree_state.next();
                }
            }
        }
    }

    fn tab_under(&self, column: u16, row: u16) -> Option<(PaneId, TabId)> {
        for pane in &self.ui.layout.panes {
            if pane.tab_bar.contains_point(column, row) {
                let strip_col = column - pane.tab_bar.x;
                let hit = self
                    .workspace
                    .pane(pane.id)
                    .and_then(|p| tab_at(p, pane.tab_bar.width, strip_col));
                return hit.map(|tab| (pane.id, tab));
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();
        let mut layout = LayoutMap {
            window: size,
            ..Default::default()
        };

        if size.height < 3 {
            return;
        }

        let status_area = Rect {
            y: size.bottom() - 1,
            height: 1,
            ..size
        };
        let main = Rect {
            height: size.height - 1,
            ..size
        };

        // Terminal panel at the bottom
        let terminal_rows = if self.workspace.terminal_panel.visible {
            let wanted = (self.workspace.terminal_panel.height / ROW_LOGICAL_PX) as u16;
            wanted.clamp(4, (main.height * 9 / 10).max(4)).min(main.height)
        } else {
            0
        };
        let editor_region = Rect {
            height: main.height - terminal_rows.min(main.height),
            ..main
        };
        if terminal_rows > 0 {
            layout.terminal = Rect {
                y: main.y + editor_region.height,
                height: terminal_rows,
                ..main
            };
            layout.terminal_border_y = Some(layout.terminal.y);
        }

        // Sidebar on the left
        let sidebar_cols = if self.workspace.sidebar.visible {
            ((self.workspace.sidebar.width / CELL_LOGICAL_PX) as u16)
                .clamp(18, (editor_region.width / 2).max(18))
                .min(editor_region.width)
        } else {
            0
        };
        if sidebar_cols > 0 {
            layout.sidebar = Rect {
                width: sidebar_cols,
                ..editor_region
            };
            layout.sidebar_border_x = Some(layout.sidebar.right().saturating_sub(1));
        }
        let editor_area = Rect {
            x: editor_region.x + sidebar_cols,
            width: editor_region.width - sidebar_cols,
            ..editor_region
        };

        self.render_sidebar(frame, layout.sidebar, &mut layout);
        self.render_panes(frame, editor_area, &mut layout);
        self.render_terminal(frame, layout.terminal, &mut layout);
        self.render_status_bar(frame, status_area);
        self.render_modal(frame, size);

        self.ui.layout = layout;
    }

    fn render_sidebar(&mut self, frame: &mut Frame, area: Rect, layout: &mut LayoutMap) {
        if area.width == 0 {
            return;
        }
        let focused = self.ui.focus == FocusRegion::Sidebar;

        let title = self
            .ui
            .cwd
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.ui.cwd.to_string_lossy().into_owned());

        let block = Block::default()
            .title(format!(" {title} "))
            .borders(Borders::ALL)
            .border_style(if focused {
                self.theme.border_focused()
            } else {
                self.theme.border_unfocused()
            });

        layout.sidebar_inner = block.inner(area);

        let tree = FileTree::new(&self.ui.entries, &self.theme).block(block);
        frame.render_stateful_widget(tree, area, &mut self.ui.tree_state.list_state);
    }

    fn render_panes(&mut self, frame: &mut Frame, area: Rect, layout: &mut LayoutMap) {
        let pane_ids = self.workspace.pane_order().to_vec();
        if pane_ids.is_empty() || area.width == 0 {
            return;
        }

        let constraints: Vec<Constraint> = pane_ids
            .iter()
            .map(|id| match self.workspace.pane(*id) {
                Some(pane) => match pane.width {
                    Some(width) => Constraint::Length((width / CELL_LOGICAL_PX) as u16),
                    None => Constraint::Fill(pane.flex.max(1.0) as u16),
                },
                None => Constraint::Fill(1),
            })
            .collect();

        let rects = Layout::horizontal(constraints).spacing(1).split(area);

        for (index, (id, rect)) in pane_ids.iter().zip(rects.iter()).enumerate() {
            if index + 1 < pane_ids.len() {
                layout.handles.push((index, rect.right()));
            }
            self.render_one_pane(frame, *id, *rect, layout);
        }
    }

    fn render_one_pane(&mut self, frame: &mut Frame, id: PaneId, area: Rect, layout: &mut LayoutMap) {
        let Some(pane) = self.workspace.pane(id) else {
            return;
        };
        let is_active = self.workspace.active_id() == id;
        let focused = is_active && self.ui.focus == FocusRegion::Editor;

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if focused {
                self.theme.border_focused()
            } else {
                self.theme.border_unfocused()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 {
            return;
        }
        let tab_bar_area = Rect { height: 1, ..inner };
        let content_area = Rect {
            y: inner.y + 1,
            height: inner.height - 1,
            ..inner
        };

        let (dragging, hover) = match self.workspace.drag() {
            DragState::Tab { source_pane, tab } if *source_pane == id => {
                let hover = self
                    .ui
                    .drag_hover
                    .filter(|(pane, _)| *pane == id)
                    .map(|(_, tab)| tab);
                (Some(*tab), hover)
            }
            _ => (None, None),
        };

        frame.render_widget(
            TabBar::new(pane, &self.theme)
                .dragging(dragging)
                .drop_target(hover),
            tab_bar_area,
        );

        match pane.active_tab() {
            Some(tab) if !tab.mode.is_editing() => {
                let text =
                    self.ui
                        .render_cache
                        .get_or_render(tab.id, &tab.name, &tab.content_cache);
                frame.render_widget(
                    EditorView::new(pane, &self.theme).preview(text),
                    content_area,
                );
            }
            _ => {
                frame.render_widget(
                    EditorView::new(pane, &self.theme).edit_cursor(self.ui.edit_cursor),
                    content_area,
                );
            }
        }

        layout.panes.push(PaneLayout {
            id,
            area,
            tab_bar: tab_bar_area,
            content: content_area,
        });
    }

    fn render_terminal(&mut self, frame: &mut Frame, area: Rect, layout: &mut LayoutMap) {
        if area.height == 0 {
            return;
        }
        let focused = self.ui.focus == FocusRegion::Terminal;

        let block = Block::default()
            .title(" Terminal (Ctrl+J to toggle) ")
            .borders(Borders::TOP)
            .border_style(if focused {
                self.theme.border_focused()
            } else {
                self.theme.border_unfocused()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        frame.render_widget(TerminalView::new(&self.mux, &self.theme), inner);

        // The output area excludes the session strip row
        layout.terminal_output = Rect {
            y: inner.y + 1,
            height: inner.height.saturating_sub(1),
            ..inner
        };
    }

    fn render_status_bar(&mut self, frame: &mut Frame, area: Rect) {
        let status = if let Some(ref msg) = self.ui.status_message {
            msg.clone()
        } else if let Some(index) = self.ui.link_index {
            let token = self
                .workspace
                .active_pane()
                .active_tab()
                .and_then(|tab| {
                    self.resolver
                        .links_in(&tab.content_cache)
                        .get(index)
                        .map(|l| l.token.clone())
                })
                .unwrap_or_default();
            format!("link: [[{token}]] — Enter to open, f for next")
        } else {
            let pane = self.workspace.active_pane();
            let editing = pane
                .active_tab()
                .is_some_and(|t| t.mode.is_editing());
            if editing {
                "EDIT — Ctrl+S save · Esc cancel · Ctrl+L complete [[link".to_string()
            } else {
                format!(
                    "{} pane(s) · {} tab(s) · zoom {:.1} · ? for help",
                    self.workspace.pane_count(),
                    pane.len(),
                    self.workspace.zoom()
                )
            }
        };

        let paragraph = Paragraph::new(status).style(self.theme.status_bar());
        frame.render_widget(paragraph, area);
    }

    fn render_modal(&mut self, frame: &mut Frame, area: Rect) {
        match &self.ui.modal {
            Modal::None => {}

            Modal::Input {
                title,
                prompt,
                value,
                ..
            } => {
                let modal_area = centered_rect(60, 20, area);
                frame.render_widget(Clear, modal_area);

                let block = Block::default()
                    .title(format!(" {} ", title))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.modal_warning));

                let inner = block.inner(modal_area);
                frame.render_widget(block, modal_area);

                let text = format!("{}\n\n> {}_", prompt, value);
                frame.render_widget(Paragraph::new(text), inner);
            }

            Modal::Confirm { title, message, .. } => {
                let modal_area = centered_rect(50, 15, area);
                frame.render_widget(Clear, modal_area);

                let block = Block::default()
                    .title(format!(" {} ", title))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.modal_error));

                let inner = block.inner(modal_area);
                frame.render_widget(block, modal_area);

                let text = format!("{}\n\n[Enter] Confirm  [Esc] Cancel", message);
                frame.render_widget(Paragraph::new(text), inner);
            }

            Modal::Error { message } => {
                let modal_area = centered_rect(60, 20, area);
                frame.render_widget(Clear, modal_area);

                let block = Block::default()
                    .title(" Error ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.modal_error));

                let inner = block.inner(modal_area);
                frame.render_widget(block, modal_area);

                let text = format!("{}\n\nPress any key to close.", message);
                frame.render_widget(Paragraph::new(text), inner);
            }

            Modal::Search {
                query,
                results,
                selected,
            } => {
                let modal_area = centered_rect(70, 60, area);
                frame.render_widget(Clear, modal_area);

                let block = Block::default()
                    .title(" Search ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.modal_info));

                let inner = block.inner(modal_area);
                frame.render_widget(block, modal_area);

                let mut lines = vec![Line::from(format!("🔍 {query}_")), Line::default()];
                for (i, hit) in results.iter().enumerate() {
                    let marker = if i == *selected { "▶ " } else { "  " };
                    lines.push(Line::from(format!("{marker}{}", hit.entry.name)));
                    lines.push(Line::from(format!("     {}", hit.snippet)));
                }
                if results.is_empty() && !query.is_empty() {
                    lines.push(Line::from("  (no results)"));
                }
                frame.render_widget(Paragraph::new(lines), inner);
            }

            Modal::Help => {
                let modal_area = centered_rect(70, 80, area);
                frame.render_widget(Clear, modal_area);

                let block = Block::default()
                    .title(" Help ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.modal_info));

                let inner = block.inner(modal_area);
                frame.render_widget(block, modal_area);

                let help_text = r#"
Navigation:
  j/k, Up/Down    Navigate / scroll
  Enter           Open selection (file, link, search hit)
  Tab             Cycle focus: sidebar / editor / terminal
  Backspace       Parent directory (sidebar)

Files:
  n / N           New file / new folder
  r / d           Rename / delete selected entry
  /               Search vault content

Panes & tabs:
  s / X           Split pane / close pane
  p               Next pane
  h / l           Previous / next tab
  H / L           Move tab left / right (drag with mouse too)
  w               Close tab

Editing:
  e               Edit the active document
  Ctrl+S          Save (returns to preview)
  Esc             Cancel edit (keystrokes kept in the buffer)
  Ctrl+L          Complete an open [[ link token
  f               Select next [[link]], Enter follows it
  o               Open in external editor (terminal)

Terminal:
  t               New terminal session
  T / W           Next / close terminal session
  Ctrl+J          Toggle terminal panel
  Ctrl+Q          Leave terminal focus

View:
  Ctrl+B          Toggle sidebar
  + / -           Zoom in / out
  q               Quit

Press any key to close this help.
"#;
                frame.render_widget(Paragraph::new(help_text), inner);
            }
        }
    }
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(area);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(vertical[1])[1]
}

/// Rect helpers for mouse hit-testing
trait RectContains {
    fn contains_point(&self, column: u16, row: u16) -> bool;
    fn contains_row(&self, row: u16) -> bool;
}

impl RectContains for Rect {
    fn contains_point(&self, column: u16, row: u16) -> bool {
        column >= self.x && column < self.right() && row >= self.y && row < self.bottom()
    }

    fn contains_row(&self, row: u16) -> bool {
        row >= self.y && row < self.bottom()
    }
}

// ----------------------------------------------------------------------
// Editing cursor helpers
// ----------------------------------------------------------------------

/// Clamp a cursor into the text and snap it back to a char boundary
fn snap_to_boundary(text: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(text.len());
    while !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

/// Byte offset of the char before `cursor`, if any
fn prev_char_start(text: &str, cursor: usize) -> Option<usize> {
    text[..cursor.min(text.len())]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
}

/// Byte offset just past the char at `cursor`
fn next_char_end(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    text[cursor..]
        .chars()
        .next()
        .map(|c| cursor + c.len_utf8())
        .unwrap_or(text.len())
}

/// Start of the line containing `cursor`
fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor.min(text.len())]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// End of the line containing `cursor` (before the newline)
fn line_end(text: &str, cursor: usize) -> usize {
    let cursor = cursor.min(text.len());
    text[cursor..]
        .find('\n')
        .map(|i| cursor + i)
        .unwrap_or(text.len())
}

/// Move the cursor one line up or down, keeping the column when possible
fn move_vertical(text: &str, cursor: usize, direction: i32) -> usize {
    let cursor = cursor.min(text.len());
    let start = line_start(text, cursor);
    let column = text[start..cursor].chars().count();

    let target_start = if direction < 0 {
        if start == 0 {
            return cursor;
        }
        line_start(text, start - 1)
    } else {
        let end = line_end(text, cursor);
        if end >= text.len() {
            return cursor;
        }
        end + 1
    };

    let target_end = line_end(text, target_start);
    let mut offset = target_start;
    for c in text[target_start..target_end].chars().take(column) {
        offset += c.len_utf8();
    }
    offset
}

/// Find an unclosed `[[` token ending at the cursor: returns the byte
/// offset where the prefix starts and the prefix text.
fn open_token_prefix(text: &str, cursor: usize) -> Option<(usize, String)> {
    let before = &text[..cursor.min(text.len())];
    let open = before.rfind("[[")?;
    let prefix = &before[open + 2..];
    if prefix.contains(']') || prefix.contains('\n') {
        return None;
    }
    Some((open + 2, prefix.to_string()))
}
