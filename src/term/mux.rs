//! Terminal multiplexer
//!
//! Owns the ordered collection of terminal sessions and applies the same
//! tab-addressing rules as the editor panes to a different payload: a live
//! bidirectional byte stream. Per-session machine:
//! Created → Connected → (Suspended ⇄ Active) → Destroyed, with `Failed`
//! and `Exited` as terminal-side outcomes. Exactly one session is Active.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, TerminalError};

use super::host::{ProcessHost, TermEvent, TermSize};

/// Unique identifier for a terminal session; doubles as the process-host
/// handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalId(Uuid);

impl TerminalId {
    /// Create a new random terminal ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TerminalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Connection status of a session's backing process
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnState {
    /// Requested but not connected (host creation failed or pending)
    Created,
    /// Backing process is running
    Connected,
    /// The host could not create the backing process
    Failed(String),
    /// The backing process ended
    Exited,
}

/// Externally observable session state, with Active/Suspended derived from
/// the multiplexer's single active designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Suspended,
    Failed,
    Exited,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Failed => write!(f, "failed"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

/// Cap on retained output per session, in bytes
pub const MAX_BUFFER_BYTES: usize = 256 * 1024;

/// One terminal session
#[derive(Debug)]
pub struct TerminalSession {
    /// Unique identifier and process-host handle
    pub id: TerminalId,
    /// Display title
    pub title: String,
    conn: ConnState,
    /// Retained output, kept while suspended
    buffer: String,
    /// Last geometry reported to the host
    size: TermSize,
}

impl TerminalSession {
    fn new(title: String) -> Self {
        Self {
            id: TerminalId::new(),
            title,
            conn: ConnState::Created,
            buffer: String::new(),
            size: TermSize::default(),
        }
    }

    /// Retained output
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Failure reason, when the host could not create the process
    pub fn failure(&self) -> Option<&str> {
        match &self.conn {
            ConnState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    fn push_output(&mut self, bytes: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        // Trim from the front at a line boundary once over the cap
        if self.buffer.len() > MAX_BUFFER_BYTES {
            let mut excess = self.buffer.len() - MAX_BUFFER_BYTES;
            while !self.buffer.is_char_boundary(excess) {
                excess += 1;
            }
            let cut = self.buffer[excess..]
                .find('\n')
                .map(|i| excess + i + 1)
                .unwrap_or(excess);
            self.buffer.drain(..cut);
        }
    }
}

/// The terminal multiplexer
pub struct TerminalMultiplexer {
    host: Arc<dyn ProcessHost>,
    sessions: HashMap<TerminalId, TerminalSession>,
    order: Vec<TerminalId>,
    active: Option<TerminalId>,
    shell: String,
    created_count: usize,
}

impl TerminalMultiplexer {
    /// Create a multiplexer over a process host
    pub fn new(host: Arc<dyn ProcessHost>, shell: impl Into<String>) -> Self {
        Self {
            host,
            sessions: HashMap::new(),
            order: Vec::new(),
            active: None,
            shell: shell.into(),
            created_count: 0,
        }
    }

    /// Number of sessions
    pub fn session_count(&self) -> usize {
        self.order.len()
    }

    /// Session IDs in display order
    pub fn session_order(&self) -> &[TerminalId] {
        &self.order
    }

    /// Sessions in display order
    pub fn sessions_in_order(&self) -> impl Iterator<Item = &TerminalSession> {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }

    /// Get a session by ID
    pub fn session(&self, id: TerminalId) -> Option<&TerminalSession> {
        self.sessions.get(&id)
    }

    /// The active session's ID, if any
    pub fn active_id(&self) -> Option<TerminalId> {
        self.active
    }

    /// The externally observable state of a session
    pub fn state(&self, id: TerminalId) -> Option<SessionState> {
        let session = self.sessions.get(&id)?;
        Some(match &session.conn {
            ConnState::Created => SessionState::Created,
            ConnState::Failed(_) => SessionState::Failed,
            ConnState::Exited => SessionState::Exited,
            ConnState::Connected => {
                if self.active == Some(id) {
                    SessionState::Active
                } else {
                    SessionState::Suspended
                }
            }
        })
    }

    /// Create a session and make it Active.
    ///
    /// Host failure leaves the session in Created-with-error so the tab can
    /// show an inline error state instead of silently disappearing.
    pub async fn create_session(
        &mut self,
        title: Option<String>,
        size: TermSize,
    ) -> TerminalId {
        self.created_count += 1;
        let title = title.unwrap_or_else(|| format!("Terminal {}", self.created_count));

        let mut session = TerminalSession::new(title);
        session.size = size;
        let id = session.id;

        match self.host.create(id, &self.shell, size).await {
            Ok(()) => {
                session.conn = ConnState::Connected;
                info!("terminal session {} connected", id);
            }
            Err(e) => {
                warn!("terminal session {} failed to connect: {}", id, e);
                session.conn = ConnState::Failed(e.to_string());
            }
        }

        self.sessions.insert(id, session);
        self.order.push(id);
        self.active = Some(id);
        id
    }

    /// Close a session, tearing down its process and buffer.
    ///
    /// When the closed session was Active, Active moves to an arbitrary
    /// remaining session.
    pub async fn close_session(&mut self, id: TerminalId) -> Result<()> {
        let session = self
            .sessions
            .remove(&id)
            .ok_or(TerminalError::SessionNotFound(id))?;
        self.order.retain(|s| *s != id);

        if session.conn == ConnState::Connected {
            if let Err(e) = self.host.kill(id).await {
                warn!("failed to kill backing process for {}: {}", id, e);
            }
        }

        if self.active == Some(id) {
            self.active = self.order.last().copied();
        }

        info!("closed terminal session {}", id);
        Ok(())
    }

    /// Switch the Active session.
    ///
    /// The previously active session becomes Suspended: its process keeps
    /// running and its output keeps accumulating, only rendering stops. The
    /// caller must follow up with `sync_active_geometry`, since geometry
    /// computed while hidden is unreliable.
    pub fn activate(&mut self, id: TerminalId) -> Result<()> {
        if !self.sessions.contains_key(&id) {
            return Err(TerminalError::SessionNotFound(id).into());
        }
        self.active = Some(id);
        Ok(())
    }

    /// Cycle Active to the next session in order
    pub fn activate_next(&mut self) {
        if self.order.is_empty() {
            return;
        }
        let next = match self.active.and_then(|id| self.order.iter().position(|s| *s == id)) {
            Some(i) => self.order[(i + 1) % self.order.len()],
            None => self.order[0],
        };
        self.active = Some(next);
    }

    /// Forward input bytes to a session's backing process
    pub async fn send_input(&self, id: TerminalId, bytes: &[u8]) -> Result<()> {
        let session = self
            .sessions
            .get(&id)
            .ok_or(TerminalError::SessionNotFound(id))?;
        if session.conn != ConnState::Connected {
            return Err(TerminalError::NotConnected(id).into());
        }
        self.host.write_input(id, bytes).await
    }

    /// Send a line of text (plus newline) to the active session
    pub async fn send_line_to_active(&self, line: &str) -> Result<()> {
        let id = self.active.ok_or(TerminalError::NoActiveSession)?;
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.send_input(id, &bytes).await
    }

    /// Reconcile the active session's geometry with the hosting area,
    /// reporting changes to the process host.
    pub async fn sync_active_geometry(&mut self, size: TermSize) -> Result<()> {
        let Some(id) = self.active else {
            return Ok(());
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return Ok(());
        };
        if session.conn != ConnState::Connected || session.size == size {
            return Ok(());
        }

        session.size = size;
        debug!("resyncing geometry for {}: {}x{}", id, size.cols, size.rows);
        self.host.resize(id, size).await
    }

    /// Ensure a usable Active session exists, creating one when necessary.
    /// Used when an external action needs a terminal (e.g. opening a file
    /// in a line-mode editor).
    pub async fn ensure_active_session(&mut self, size: TermSize) -> TerminalId {
        if let Some(id) = self.active {
            if self.state(id) == Some(SessionState::Active) {
                return id;
            }
        }
        self.create_session(None, size).await
    }

    /// Apply an event from the process host.
    ///
    /// Events for unknown session IDs are stale (the session was closed
    /// while output was in flight) and are silently discarded.
    pub fn apply_event(&mut self, event: TermEvent) {
        match event {
            TermEvent::Output { id, bytes } => match self.sessions.get_mut(&id) {
                Some(session) => session.push_output(&bytes),
                None => debug!("dropping output for closed session {}", id),
            },
            TermEvent::Exited { id } => {
                if let Some(session) = self.sessions.get_mut(&id) {
                    info!("backing process for {} exited", id);
                    session.conn = ConnState::Exited;
                }
            }
        }
    }

    /// Check the multiplexer invariants. Used by tests after mutations.
    pub fn check_invariants(&self) -> bool {
        let arena_matches_order = self.order.len() == self.sessions.len()
            && self.order.iter().all(|id| self.sessions.contains_key(id));
        let active_is_member = match self.active {
            Some(id) => self.order.contains(&id),
            None => true,
        };
        let at_most_one_active = self
            .order
            .iter()
            .filter(|id| self.state(**id) == Some(SessionState::Active))
            .count()
            <= 1;

        arena_matches_order && active_is_member && at_most_one_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Recording stub host; optionally refuses creation.
    #[derive(Default)]
    struct StubHost {
        fail_create: bool,
        calls: StdMutex<Vec<String>>,
    }

    impl StubHost {
        fn failing() -> Self {
            Self {
                fail_create: true,
                ..Default::default()
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl ProcessHost for StubHost {
        async fn create(&self, id: TerminalId, shell: &str, _size: TermSize) -> Result<()> {
            self.record(format!("create {} {}", id, shell));
            if self.fail_create {
                Err(TerminalError::SpawnFailed("host offline".to_string()).into())
            } else {
                Ok(())
            }
        }

        async fn write_input(&self, id: TerminalId, bytes: &[u8]) -> Result<()> {
            self.record(format!("write {} {}", id, bytes.len()));
            Ok(())
        }

        async fn resize(&self, id: TerminalId, size: TermSize) -> Result<()> {
            self.record(format!("resize {} {}x{}", id, size.cols, size.rows));
            Ok(())
        }

        async fn kill(&self, id: TerminalId) -> Result<()> {
            self.record(format!("kill {}", id));
            Ok(())
        }
    }

    fn mux_with(host: StubHost) -> TerminalMultiplexer {
        TerminalMultiplexer::new(Arc::new(host), "bash")
    }

    #[tokio::test]
    async fn test_create_makes_session_active() {
        let mut mux = mux_with(StubHost::default());
        let id = mux.create_session(None, TermSize::default()).await;

        assert_eq!(mux.session_count(), 1);
        assert_eq!(mux.active_id(), Some(id));
        assert_eq!(mux.state(id), Some(SessionState::Active));
        assert_eq!(mux.session(id).unwrap().title, "Terminal 1");
        assert!(mux.check_invariants());
    }

    #[tokio::test]
    async fn test_switching_keeps_exactly_one_active() {
        let mut mux = mux_with(StubHost::default());
        let t1 = mux.create_session(None, TermSize::default()).await;
        let t2 = mux.create_session(None, TermSize::default()).await;

        assert_eq!(mux.state(t1), Some(SessionState::Suspended));
        assert_eq!(mux.state(t2), Some(SessionState::Active));

        mux.activate(t1).unwrap();
        assert_eq!(mux.state(t1), Some(SessionState::Active));
        assert_eq!(mux.state(t2), Some(SessionState::Suspended));
        assert!(mux.check_invariants());
    }

    #[tokio::test]
    async fn test_failed_create_leaves_inline_error_session() {
        let mut mux = mux_with(StubHost::failing());
        let id = mux.create_session(None, TermSize::default()).await;

        assert_eq!(mux.session_count(), 1);
        assert_eq!(mux.state(id), Some(SessionState::Failed));
        assert!(mux.session(id).unwrap().failure().unwrap().contains("host offline"));

        // Input to a failed session is refused, not forwarded
        assert!(mux.send_input(id, b"ls\n").await.is_err());
    }

    #[tokio::test]
    async fn test_close_active_moves_active_to_remaining() {
        let mut mux = mux_with(StubHost::default());
        let t1 = mux.create_session(None, TermSize::default()).await;
        let t2 = mux.create_session(None, TermSize::default()).await;

        mux.close_session(t2).await.unwrap();
        assert_eq!(mux.active_id(), Some(t1));
        assert_eq!(mux.state(t1), Some(SessionState::Active));

        mux.close_session(t1).await.unwrap();
        assert_eq!(mux.active_id(), None);
        assert!(mux.check_invariants());
    }

    #[tokio::test]
    async fn test_suspended_session_keeps_accumulating_output() {
        let mut mux = mux_with(StubHost::default());
        let t1 = mux.create_session(None, TermSize::default()).await;
        let _t2 = mux.create_session(None, TermSize::default()).await;

        // t1 is suspended now; its stream keeps flowing
        mux.apply_event(TermEvent::Output {
            id: t1,
            bytes: b"background output".to_vec(),
        });
        assert_eq!(mux.session(t1).unwrap().buffer(), "background output");
    }

    #[tokio::test]
    async fn test_stale_output_discarded() {
        let mut mux = mux_with(StubHost::default());
        let id = mux.create_session(None, TermSize::default()).await;
        mux.close_session(id).await.unwrap();

        mux.apply_event(TermEvent::Output {
            id,
            bytes: b"late".to_vec(),
        });
        assert_eq!(mux.session_count(), 0);
    }

    #[tokio::test]
    async fn test_exit_keeps_buffer_until_close() {
        let mut mux = mux_with(StubHost::default());
        let id = mux.create_session(None, TermSize::default()).await;

        mux.apply_event(TermEvent::Output {
            id,
            bytes: b"$ exit\n".to_vec(),
        });
        mux.apply_event(TermEvent::Exited { id });

        assert_eq!(mux.state(id), Some(SessionState::Exited));
        assert_eq!(mux.session(id).unwrap().buffer(), "$ exit\n");
    }

    #[tokio::test]
    async fn test_geometry_resync_only_on_change() {
        let host = StubHost::default();
        let mut mux = TerminalMultiplexer::new(Arc::new(host), "bash");
        let id = mux.create_session(None, TermSize::new(24, 80)).await;

        // Same size: no host call
        mux.sync_active_geometry(TermSize::new(24, 80)).await.unwrap();
        // Changed size: host informed
        mux.sync_active_geometry(TermSize::new(50, 120)).await.unwrap();
        assert_eq!(mux.session(id).unwrap().size, TermSize::new(50, 120));
    }

    #[tokio::test]
    async fn test_ensure_active_reuses_or_creates() {
        let mut mux = mux_with(StubHost::default());
        let first = mux.ensure_active_session(TermSize::default()).await;
        let second = mux.ensure_active_session(TermSize::default()).await;
        assert_eq!(first, second);
        assert_eq!(mux.session_count(), 1);

        mux.apply_event(TermEvent::Exited { id: first });
        let third = mux.ensure_active_session(TermSize::default()).await;
        assert_ne!(first, third);
        assert_eq!(mux.session_count(), 2);
    }

    #[test]
    fn test_buffer_trims_at_line_boundary() {
        let mut session = TerminalSession::new("t".to_string());
        let line = "x".repeat(1023) + "\n";
        for _ in 0..(MAX_BUFFER_BYTES / 1024 + 8) {
            session.push_output(line.as_bytes());
        }

        assert!(session.buffer().len() <= MAX_BUFFER_BYTES);
        assert!(session.buffer().starts_with('x'));
        assert!(session.buffer().ends_with('\n'));
    }
}
