//! Debounced state persistence
//!
//! Bursts of workspace mutations (continuous resize, rapid tab switching)
//! must produce one durable write, not one per event. `SaveDebouncer` runs
//! a background task with a trailing debounce window: every `schedule()`
//! restarts the window, and the write happens once it elapses quietly.
//! `flush()` forces an immediate write and awaits completion, used at
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, warn};

use super::AppState;

enum SaverMsg {
    Schedule,
    Flush(oneshot::Sender<()>),
}

/// Handle to the debounced save task
#[derive(Clone)]
pub struct SaveDebouncer {
    tx: mpsc::UnboundedSender<SaverMsg>,
}

impl SaveDebouncer {
    /// Spawn the save task over shared application state
    pub fn spawn(state: Arc<RwLock<AppState>>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(state, delay, rx));
        Self { tx }
    }

    /// Schedule a write; supersedes any pending window
    pub fn schedule(&self) {
        let _ = self.tx.send(SaverMsg::Schedule);
    }

    /// Write immediately and wait for the write to finish
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SaverMsg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn run(
    state: Arc<RwLock<AppState>>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<SaverMsg>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            SaverMsg::Flush(ack) => {
                write(&state).await;
                let _ = ack.send(());
            }
            SaverMsg::Schedule => {
                // Trailing debounce: keep restarting the window while
                // further schedules arrive
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {
                            write(&state).await;
                            break;
                        }
                        msg = rx.recv() => match msg {
                            Some(SaverMsg::Schedule) => continue,
                            Some(SaverMsg::Flush(ack)) => {
                                write(&state).await;
                                let _ = ack.send(());
                                break;
                            }
                            None => {
                                write(&state).await;
                                return;
                            }
                        },
                    }
                }
            }
        }
    }
}

async fn write(state: &Arc<RwLock<AppState>>) {
    let guard = state.read().await;
    match guard.save() {
        Ok(()) => debug!("persisted application state"),
        Err(e) => warn!("failed to persist application state: {}", e),
    }
}
