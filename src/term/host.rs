//! Pseudo-terminal process host
//!
//! The multiplexer reaches backing processes only through the
//! `ProcessHost` trait: create/write/resize/kill keyed by session ID, with
//! output bytes delivered back as a stream of `TermEvent`s. `PtyHost`
//! implements it over async PTYs within the tokio runtime.

use std::collections::HashMap;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use crate::error::{Result, TerminalError};

use super::TerminalId;

/// Terminal geometry in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub rows: u16,
    pub cols: u16,
}

impl TermSize {
    /// Create a size
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

/// Events delivered from backing processes, keyed by session ID
#[derive(Debug, Clone)]
pub enum TermEvent {
    /// Output bytes arrived for a session
    Output { id: TerminalId, bytes: Vec<u8> },
    /// The backing process ended (EOF or read error)
    Exited { id: TerminalId },
}

/// Asynchronous command interface to the process host
#[async_trait]
pub trait ProcessHost: Send + Sync {
    /// Start a backing process bound to the session ID
    async fn create(&self, id: TerminalId, shell: &str, size: TermSize) -> Result<()>;

    /// Forward input bytes to a session's process
    async fn write_input(&self, id: TerminalId, bytes: &[u8]) -> Result<()>;

    /// Report new terminal geometry for a session's process
    async fn resize(&self, id: TerminalId, size: TermSize) -> Result<()>;

    /// Tear down a session's process
    async fn kill(&self, id: TerminalId) -> Result<()>;
}

struct PtySession {
    writer: WriteHalf<pty_process::Pty>,
    pty_fd: i32,
    child: tokio::process::Child,
}

/// PTY-backed process host
///
/// Each `create` opens a PTY pair, spawns the shell on the slave side, and
/// dedicates a reader task that forwards output (and eventual exit) into
/// the event channel.
pub struct PtyHost {
    events: mpsc::Sender<TermEvent>,
    sessions: Arc<Mutex<HashMap<TerminalId, PtySession>>>,
}

impl PtyHost {
    /// Create a host that delivers output through the given channel
    pub fn new(events: mpsc::Sender<TermEvent>) -> Self {
        Self {
            events,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn spawn_reader(
        &self,
        id: TerminalId,
        mut reader: ReadHalf<pty_process::Pty>,
    ) {
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => {
                        let _ = events.send(TermEvent::Exited { id }).await;
                        break;
                    }
                    Ok(n) => {
                        let event = TermEvent::Output {
                            id,
                            bytes: buf[..n].to_vec(),
                        };
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // EIO is expected when the PTY closes
                        if e.raw_os_error() != Some(5) {
                            warn!("PTY read error for session {}: {}", id, e);
                        }
                        let _ = events.send(TermEvent::Exited { id }).await;
                        break;
                    }
                }
            }
            debug!("reader task for session {} finished", id);
        });
    }
}

/// Open a PTY pair and spawn the shell on its slave side
fn spawn_shell(
    shell: &str,
    size: TermSize,
) -> anyhow::Result<(pty_process::Pty, i32, tokio::process::Child)> {
    let pty = pty_process::Pty::new().context("Failed to open PTY")?;
    pty.resize(pty_process::Size::new(size.rows, size.cols))
        .context("Failed to size PTY")?;

    // Keep the raw fd for resize operations after the pty is split
    let pty_fd = pty.as_raw_fd();

    let mut cmd = pty_process::Command::new(shell);
    let pts = pty.pts().context("Failed to open PTY slave")?;
    let child = cmd.spawn(&pts).context("Failed to spawn shell")?;

    Ok((pty, pty_fd, child))
}

#[async_trait]
impl ProcessHost for PtyHost {
    async fn create(&self, id: TerminalId, shell: &str, size: TermSize) -> Result<()> {
        let (pty, pty_fd, child) =
            spawn_shell(shell, size).map_err(|e| TerminalError::SpawnFailed(format!("{e:#}")))?;

        let (reader, writer) = tokio::io::split(pty);
        self.spawn_reader(id, reader);

        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            id,
            PtySession {
                writer,
                pty_fd,
                child,
            },
        );

        info!("spawned {} for terminal session {}", shell, id);
        Ok(())
    }

    async fn write_input(&self, id: TerminalId, bytes: &[u8]) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(TerminalError::SessionNotFound(id))?;

        session
            .writer
            .write_all(bytes)
            .await
            .map_err(|e| TerminalError::Pty(e.to_string()))?;
        session
            .writer
            .flush()
            .await
            .map_err(|e| TerminalError::Pty(e.to_string()))?;
        Ok(())
    }

    async fn resize(&self, id: TerminalId, size: TermSize) -> Result<()> {
        let sessions = self.sessions.lock().await;
        let session = sessions
            .get(&id)
            .ok_or(TerminalError::SessionNotFound(id))?;

        resize_pty(session.pty_fd, size.rows, size.cols);
        Ok(())
    }

    async fn kill(&self, id: TerminalId) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let mut session = sessions
            .remove(&id)
            .ok_or(TerminalError::SessionNotFound(id))?;
        drop(sessions);

        if let Err(e) = session.child.start_kill() {
            debug!("kill for session {} returned: {}", id, e);
        }
        let _ = session.child.wait().await;

        info!("terminal session {} torn down", id);
        Ok(())
    }
}

/// Resize a PTY using ioctl
fn resize_pty(fd: i32, rows: u16, cols: u16) {
    use nix::libc::{TIOCSWINSZ, ioctl, winsize};

    let ws = winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: fd was obtained from a live PTY, ws is a valid stack pointer
    unsafe {
        ioctl(fd, TIOCSWINSZ, &ws);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_size_default() {
        let size = TermSize::default();
        assert_eq!(size.rows, 24);
        assert_eq!(size.cols, 80);
    }

    #[tokio::test]
    async fn test_write_to_unknown_session_errors() {
        let (tx, _rx) = mpsc::channel(8);
        let host = PtyHost::new(tx);

        let err = host
            .write_input(TerminalId::new(), b"ls\n")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    // Spawning a real shell is exercised in the integration tests, which
    // skip when no usable shell is present.
}
