//! Integration tests for notedesk
//!
//! The workspace and multiplexer tests run against the pure model (with a
//! stub process host); vault tests use isolated temp directories; the PTY
//! test requires a usable /bin/sh and skips itself otherwise.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tempfile::TempDir;

use notedesk::config::AppState;
use notedesk::error::Result;
use notedesk::links::LinkResolver;
use notedesk::term::{
    ProcessHost, PtyHost, SessionState, TermEvent, TermSize, TerminalId, TerminalMultiplexer,
};
use notedesk::vault::{self, LocalVault, Vault};
use notedesk::workspace::{TabId, Workspace, WorkspaceSnapshot};

// ----------------------------------------------------------------------
// Workspace model
// ----------------------------------------------------------------------

#[test]
fn active_tab_is_always_a_member() {
    let mut ws = Workspace::new();
    ws.open_in_active("a.md", "a.md");
    ws.open_in_active("b.md", "b.md");
    assert!(ws.check_invariants());

    let pane = ws.active_id();
    let order: Vec<TabId> = ws.active_pane().tab_order().to_vec();

    ws.active_pane_mut().switch_to(order[0]);
    assert!(ws.check_invariants());

    ws.active_pane_mut().close_tab(order[0]);
    assert!(ws.check_invariants());

    ws.add_pane();
    assert!(ws.check_invariants());

    ws.remove_pane(pane).unwrap();
    assert!(ws.check_invariants());
}

#[test]
fn opening_same_target_twice_activates_first() {
    let mut ws = Workspace::new();
    let (_, first, created) = ws.open_in_active("x.md", "root/x.md");
    assert!(created);
    ws.open_in_active("y.md", "root/y.md");

    let (_, second, created) = ws.open_in_active("x.md", "root/x.md");
    assert!(!created);
    assert_eq!(first, second);
    assert_eq!(ws.active_pane().len(), 2);
    assert_eq!(ws.active_pane().active_id(), Some(first));
}

#[test]
fn closing_active_tab_follows_min_rule() {
    let mut ws = Workspace::new();
    for name in ["a.md", "b.md", "c.md", "d.md"] {
        ws.open_in_active(name, name);
    }
    let order: Vec<TabId> = ws.active_pane().tab_order().to_vec();

    // Close active at index 1 in a pane of length 4: min(1, 2) = 1
    ws.active_pane_mut().switch_to(order[1]);
    ws.active_pane_mut().close_tab(order[1]);
    assert_eq!(ws.active_pane().active_id(), Some(order[2]));

    // Close active at the tail: min(2, 1) = 1
    ws.active_pane_mut().switch_to(order[3]);
    ws.active_pane_mut().close_tab(order[3]);
    assert_eq!(ws.active_pane().active_id(), Some(order[2]));
}

#[test]
fn close_scenario_from_two_tabs() {
    let mut ws = Workspace::new();
    ws.open_in_active("A.md", "A.md");
    ws.open_in_active("B.md", "B.md");

    let a = ws.active_pane().find_by_target("A.md").unwrap();
    let b = ws.active_pane().find_by_target("B.md").unwrap();
    ws.active_pane_mut().switch_to(a);

    ws.active_pane_mut().close_tab(a);

    assert_eq!(ws.active_pane().active_id(), Some(b));
    let targets: Vec<String> = ws
        .active_pane()
        .tabs_in_order()
        .map(|t| t.target.clone())
        .collect();
    assert_eq!(targets, vec!["B.md".to_string()]);
}

#[test]
fn removing_only_pane_clears_it() {
    let mut ws = Workspace::new();
    ws.open_in_active("a.md", "a.md");
    let pane = ws.active_id();

    ws.remove_pane(pane).unwrap();

    assert_eq!(ws.pane_count(), 1);
    assert_eq!(ws.active_pane().len(), 0);
}

#[test]
fn open_in_active_on_empty_workspace() {
    let mut ws = Workspace::new();
    let (pane, tab, created) = ws.open_in_active("x.md", "root/x.md");

    assert!(created);
    assert_eq!(ws.pane_count(), 1);
    assert_eq!(ws.active_id(), pane);
    assert_eq!(ws.active_pane().active_id(), Some(tab));
    assert_eq!(ws.active_pane().tab(tab).unwrap().target, "root/x.md");
}

#[test]
fn drag_reorder_within_pane_and_cross_pane_noop() {
    let mut ws = Workspace::new();
    let first = ws.active_id();
    for name in ["a.md", "b.md", "c.md"] {
        ws.open_in_active(name, name);
    }
    let order: Vec<TabId> = ws.active_pane().tab_order().to_vec();

    // Drag index 2 onto index 0
    ws.begin_tab_drag(first, order[2]).unwrap();
    assert!(ws.complete_tab_drag(first, order[0]));
    let targets: Vec<String> = ws
        .pane(first)
        .unwrap()
        .tabs_in_order()
        .map(|t| t.target.clone())
        .collect();
    assert_eq!(targets, vec!["c.md", "a.md", "b.md"]);

    // A drop into a different pane is a no-op
    let second = ws.add_pane();
    ws.set_active(second).unwrap();
    ws.open_in_active("z.md", "z.md");
    let foreign = ws.pane(second).unwrap().tab_order()[0];

    ws.begin_tab_drag(first, order[0]).unwrap();
    assert!(!ws.complete_tab_drag(second, foreign));
    let unchanged: Vec<String> = ws
        .pane(first)
        .unwrap()
        .tabs_in_order()
        .map(|t| t.target.clone())
        .collect();
    assert_eq!(unchanged, targets);
}

#[test]
fn zoom_clamps_to_bounds() {
    let mut ws = Workspace::new();
    assert_eq!(ws.set_zoom(10.0), 3.0);
    assert_eq!(ws.set_zoom(-10.0), 0.5);
}

// ----------------------------------------------------------------------
// Snapshot persistence
// ----------------------------------------------------------------------

fn populated_workspace() -> Workspace {
    let mut ws = Workspace::new();
    ws.open_in_active("a.md", "a.md");
    ws.open_in_active("b.md", "b.md");
    ws.active_pane_mut().active_tab_mut().unwrap().scroll_offset = 42;

    ws.add_pane();
    ws.open_in_active("c.md", "notes/c.md");

    let first = ws.pane_order()[0];
    ws.set_active(first).unwrap();
    ws
}

#[test]
fn snapshot_roundtrip_reproduces_layout() {
    let ws = populated_workspace();
    let snapshot = WorkspaceSnapshot::capture(&ws);
    let (restored, loads) = snapshot.restore();

    assert_eq!(restored.pane_count(), 2);
    assert_eq!(loads.len(), 3);

    let targets: Vec<Vec<String>> = restored
        .panes_in_order()
        .map(|p| p.tabs_in_order().map(|t| t.target.clone()).collect())
        .collect();
    assert_eq!(
        targets,
        vec![
            vec!["a.md".to_string(), "b.md".to_string()],
            vec!["notes/c.md".to_string()],
        ]
    );

    // Active indices and scroll offsets survive the roundtrip
    let first = restored.panes_in_order().next().unwrap();
    assert_eq!(first.active_id().and_then(|id| first.index_of(id)), Some(1));
    let b = first.find_by_target("b.md").unwrap();
    assert_eq!(first.tab(b).unwrap().scroll_offset, 42);

    // Restored content is pending a fresh fetch; nothing is cached
    assert!(first.tab(b).unwrap().content_cache.is_empty());
}

#[test]
fn snapshot_survives_the_state_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    {
        let mut state = AppState::load_from(&path).unwrap();
        state.workspace = Some(WorkspaceSnapshot::capture(&populated_workspace()));
        state.last_vault = Some(PathBuf::from("/tmp/vault"));
        state.save().unwrap();
    }

    let state = AppState::load_from(&path).unwrap();
    let (restored, _) = state.workspace.unwrap().restore();
    assert_eq!(restored.pane_count(), 2);
    assert!(restored.check_invariants());
}

#[test]
fn malformed_state_file_falls_back_to_fresh_workspace() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ definitely not json").unwrap();

    // The load fails; callers fall back explicitly, and the fallback
    // workspace is one fresh empty pane
    let state = AppState::load_from(&path).unwrap_or_else(|_| AppState::new());
    assert!(state.workspace.is_none());

    let (ws, loads) = match state.workspace {
        Some(snapshot) => snapshot.restore(),
        None => (Workspace::new(), Vec::new()),
    };
    assert_eq!(ws.pane_count(), 1);
    assert!(ws.active_pane().is_empty());
    assert!(loads.is_empty());
}

// ----------------------------------------------------------------------
// Vault backend
// ----------------------------------------------------------------------

async fn seeded_vault() -> TempDir {
    let dir = TempDir::new().unwrap();
    tokio::fs::write(dir.path().join("Notes.md"), "# Notes\nsee [[Daily]]\n")
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("Daily.md"), "today: nothing\n")
        .await
        .unwrap();
    tokio::fs::create_dir(dir.path().join("archive")).await.unwrap();
    dir
}

#[tokio::test]
async fn vault_listing_orders_directories_first() {
    let dir = seeded_vault().await;
    let vault = LocalVault::new();

    let entries = vault.list(dir.path()).await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["archive", "Daily.md", "Notes.md"]);
}

#[tokio::test]
async fn vault_read_write_create_delete() {
    let dir = seeded_vault().await;
    let vault = LocalVault::new();

    let path = dir.path().join("new.md");
    vault.create_file(&path).await.unwrap();
    assert!(vault.create_file(&path).await.is_err());

    vault.write(&path, "content").await.unwrap();
    assert_eq!(vault.read(&path).await.unwrap(), "content");

    vault.delete(&path).await.unwrap();
    assert!(vault.read(&path).await.is_err());
}

#[tokio::test]
async fn vault_search_returns_snippets() {
    let dir = seeded_vault().await;

    let hits = vault::search(dir.path(), "nothing").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.name, "Daily.md");
    assert_eq!(hits[0].snippet, "today: nothing");
}

// ----------------------------------------------------------------------
// Wiki-link resolution
// ----------------------------------------------------------------------

#[tokio::test]
async fn wiki_link_resolves_against_real_listing() {
    let dir = seeded_vault().await;
    let vault = LocalVault::new();

    let mut resolver = LinkResolver::new();
    resolver.update_cache(vault.list(dir.path()).await.unwrap());

    // [[Notes]] resolves to Notes.md without any creation prompt
    let hit = resolver.resolve("Notes").unwrap();
    assert_eq!(hit.name, "Notes.md");

    // Unresolved tokens name the file a confirmation would create
    assert!(resolver.resolve("Missing").is_none());
    assert_eq!(LinkResolver::creation_name("Missing"), "Missing.md");
}

// ----------------------------------------------------------------------
// Terminal multiplexer (stub host)
// ----------------------------------------------------------------------

#[derive(Default)]
struct StubHost {
    refuse: bool,
    resizes: Mutex<Vec<(TerminalId, TermSize)>>,
}

#[async_trait::async_trait]
impl ProcessHost for StubHost {
    async fn create(&self, _id: TerminalId, _shell: &str, _size: TermSize) -> Result<()> {
        if self.refuse {
            Err(notedesk::error::TerminalError::SpawnFailed("host down".into()).into())
        } else {
            Ok(())
        }
    }

    async fn write_input(&self, _id: TerminalId, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn resize(&self, id: TerminalId, size: TermSize) -> Result<()> {
        self.resizes.lock().unwrap().push((id, size));
        Ok(())
    }

    async fn kill(&self, _id: TerminalId) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn exactly_one_session_active_across_switches() {
    let mut mux = TerminalMultiplexer::new(Arc::new(StubHost::default()), "bash");
    let t1 = mux.create_session(None, TermSize::default()).await;
    let t2 = mux.create_session(None, TermSize::default()).await;

    assert_eq!(mux.state(t1), Some(SessionState::Suspended));
    assert_eq!(mux.state(t2), Some(SessionState::Active));

    mux.activate(t2).unwrap();
    let active_count = |mux: &TerminalMultiplexer| {
        mux.session_order()
            .iter()
            .filter(|id| mux.state(**id) == Some(SessionState::Active))
            .count()
    };
    assert_eq!(active_count(&mux), 1);

    mux.activate(t1).unwrap();
    assert_eq!(mux.state(t1), Some(SessionState::Active));
    assert_eq!(mux.state(t2), Some(SessionState::Suspended));
    assert_eq!(active_count(&mux), 1);
}

#[tokio::test]
async fn failed_host_leaves_created_session_with_error() {
    let host = StubHost {
        refuse: true,
        ..Default::default()
    };
    let mut mux = TerminalMultiplexer::new(Arc::new(host), "bash");
    let id = mux.create_session(Some("broken".into()), TermSize::default()).await;

    // The tab exists in an inline error state instead of vanishing
    assert_eq!(mux.session_count(), 1);
    assert_eq!(mux.state(id), Some(SessionState::Failed));
    assert!(mux.session(id).unwrap().failure().is_some());
}

#[tokio::test]
async fn reactivated_session_resyncs_geometry() {
    let host = Arc::new(StubHost::default());
    let mut mux = TerminalMultiplexer::new(host.clone(), "bash");
    let t1 = mux.create_session(None, TermSize::new(24, 80)).await;
    let _t2 = mux.create_session(None, TermSize::new(24, 80)).await;

    // While t1 was hidden the panel was resized; reactivation resyncs
    mux.activate(t1).unwrap();
    mux.sync_active_geometry(TermSize::new(50, 132)).await.unwrap();

    let resizes = host.resizes.lock().unwrap();
    assert_eq!(resizes.as_slice(), &[(t1, TermSize::new(50, 132))]);
}

#[tokio::test]
async fn output_for_closed_session_is_discarded() {
    let mut mux = TerminalMultiplexer::new(Arc::new(StubHost::default()), "bash");
    let id = mux.create_session(None, TermSize::default()).await;
    mux.close_session(id).await.unwrap();

    mux.apply_event(TermEvent::Output {
        id,
        bytes: b"too late".to_vec(),
    });
    assert_eq!(mux.session_count(), 0);
    assert!(mux.check_invariants());
}

// ----------------------------------------------------------------------
// PTY host (requires a shell)
// ----------------------------------------------------------------------

#[tokio::test]
async fn pty_host_round_trip() {
    if !PathBuf::from("/bin/sh").exists() {
        eprintln!("Skipping test: /bin/sh not available");
        return;
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    let host = PtyHost::new(tx);
    let id = TerminalId::new();

    host.create(id, "/bin/sh", TermSize::new(24, 80)).await.unwrap();
    host.write_input(id, b"echo pty-$((20+3))\n").await.unwrap();

    // Collect output until the marker shows up (or time out)
    let mut collected = String::new();
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(std::time::Duration::from_millis(500), rx.recv()).await {
            Ok(Some(TermEvent::Output { id: event_id, bytes })) => {
                assert_eq!(event_id, id);
                collected.push_str(&String::from_utf8_lossy(&bytes));
                if collected.contains("pty-23") {
                    break;
                }
            }
            Ok(Some(TermEvent::Exited { .. })) => break,
            Ok(None) | Err(_) => break,
        }
    }
    assert!(
        collected.contains("pty-23"),
        "expected marker in output, got: {collected:?}"
    );

    host.resize(id, TermSize::new(30, 100)).await.unwrap();
    host.kill(id).await.unwrap();
}

// ----------------------------------------------------------------------
// Property-based invariants
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
enum TabOp {
    Open(u8),
    CloseActive,
    SwitchTo(u8),
    Move(u8, u8),
}

fn tab_op_strategy() -> impl Strategy<Value = TabOp> {
    prop_oneof![
        (0u8..12).prop_map(TabOp::Open),
        Just(TabOp::CloseActive),
        (0u8..12).prop_map(TabOp::SwitchTo),
        ((0u8..12), (0u8..12)).prop_map(|(a, b)| TabOp::Move(a, b)),
    ]
}

proptest! {
    #[test]
    fn pane_invariants_hold_under_any_op_sequence(ops in prop::collection::vec(tab_op_strategy(), 0..60)) {
        let mut ws = Workspace::new();

        for op in ops {
            match op {
                TabOp::Open(n) => {
                    let name = format!("doc-{n}.md");
                    ws.open_in_active(name.clone(), name);
                }
                TabOp::CloseActive => {
                    let pane = ws.active_pane_mut();
                    if let Some(active) = pane.active_id() {
                        pane.close_tab(active);
                    }
                }
                TabOp::SwitchTo(n) => {
                    let pane = ws.active_pane_mut();
                    let order = pane.tab_order().to_vec();
                    if let Some(id) = order.get(n as usize % order.len().max(1)) {
                        pane.switch_to(*id);
                    }
                }
                TabOp::Move(a, b) => {
                    let pane = ws.active_pane_mut();
                    let order = pane.tab_order().to_vec();
                    if !order.is_empty() {
                        let from = order[a as usize % order.len()];
                        pane.move_tab(from, b as usize % order.len());
                    }
                }
            }

            prop_assert!(ws.check_invariants());
        }

        // A snapshot of any reachable state restores consistently
        let (restored, _) = WorkspaceSnapshot::capture(&ws).restore();
        prop_assert!(restored.check_invariants());
        prop_assert_eq!(restored.active_pane().len(), ws.active_pane().len());
    }
}
