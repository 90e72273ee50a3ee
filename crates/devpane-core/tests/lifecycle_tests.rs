//! Start-up sequencing and whole-workspace scenarios.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::sleep;

use devpane_core::{LifecycleController, LifecycleError, TerminalBuffer, WorkspaceConfig};
use devpane_runtime::{Filesystem, MemoryRuntime};
use devpane_testutil::{Call, ListScript, ScriptedRuntime, ScriptedSession};
use devpane_types::{BootState, FileTree};

fn scripted() -> (Arc<ScriptedSession>, LifecycleController) {
    let session = Arc::new(ScriptedSession::new());
    let runtime = Arc::new(ScriptedRuntime::with_session(session.clone()));
    let controller = LifecycleController::new(runtime, WorkspaceConfig::default());
    (session, controller)
}

#[tokio::test(start_paused = true)]
async fn test_mount_precedes_spawn_and_subscription() {
    let (session, controller) = scripted();
    let mut state = controller.subscribe_state();
    assert_eq!(*state.borrow_and_update(), BootState::NotBooted);

    let workspace = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap();

    assert_eq!(controller.state(), BootState::Ready);
    assert_eq!(controller.config().terminal.rows, 15);
    assert!(state.has_changed().unwrap());
    assert_eq!(
        session.calls(),
        vec![Call::Mount, Call::Spawn("jsh".to_string()), Call::Subscribe]
    );
    assert!(workspace.shell().is_some());
    assert!(workspace.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_boot_failure_is_terminal() {
    let runtime = Arc::new(ScriptedRuntime::failing("no cross-origin isolation"));
    let controller = LifecycleController::new(runtime.clone(), WorkspaceConfig::default());

    let err = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Boot(_)));
    assert_eq!(controller.state(), BootState::BootFailed);

    let again = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap_err();
    assert!(matches!(
        again,
        LifecycleError::AlreadyStarted(BootState::BootFailed)
    ));
    assert_eq!(runtime.boots(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_rejected() {
    let (_session, controller) = scripted();
    let _workspace = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap();

    let err = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyStarted(BootState::Ready)));
}

#[tokio::test(start_paused = true)]
async fn test_mount_failure_starts_nothing() {
    let (session, controller) = scripted();
    session.set_fail_mount(true);

    let err = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::Mount(_)));

    sleep(Duration::from_secs(2)).await;
    assert_eq!(session.calls(), vec![Call::Mount]);
    assert_eq!(session.scripted_fs().list_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_spawn_failure_keeps_workspace_running() {
    let (session, controller) = scripted();
    session.set_fail_spawn(true);
    session
        .scripted_fs()
        .push_listing(ListScript::names(&["main.js"]));

    let workspace = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap();
    assert!(workspace.shell().is_none());

    sleep(Duration::from_millis(850)).await;
    assert_eq!(workspace.files().current_files(), vec!["main.js"]);
}

#[tokio::test(start_paused = true)]
async fn test_output_order_survives_background_activity() {
    let (session, controller) = scripted();
    let term = Arc::new(TerminalBuffer::new());
    let workspace = controller.start(term.clone()).await.unwrap();
    let mut shell = session.take_spawned().unwrap();

    shell.io.stdout.write_all(b"x").await.unwrap();
    workspace.files().edit_buffer("a.js", "1");
    sleep(Duration::from_millis(700)).await;
    shell.io.stdout.write_all(b"y").await.unwrap();
    sleep(Duration::from_millis(200)).await;
    shell.io.stdout.write_all(b"z").await.unwrap();

    term.wait_for("z").await;
    assert_eq!(term.contents_lossy(), "xyz");
}

#[tokio::test(start_paused = true)]
async fn test_latest_readiness_wins() {
    let (session, controller) = scripted();
    let workspace = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap();

    let mut target = workspace.preview().target();
    session.announce(3000, "https://u1.local");
    session.announce(3001, "https://u2.local");

    target
        .wait_for(|t| t.as_deref() == Some("https://u2.local"))
        .await
        .unwrap();
    assert_eq!(
        workspace.preview().current().as_deref(),
        Some("https://u2.local")
    );
}

#[tokio::test(start_paused = true)]
async fn test_edit_flows_to_filesystem() {
    let (session, controller) = scripted();
    let fs = session.scripted_fs();
    fs.inner()
        .write(Path::new("main.js"), b"console.log(1)")
        .await
        .unwrap();
    fs.push_listing(ListScript::names(&["main.js"]));

    let workspace = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap();
    let files = workspace.files();

    sleep(Duration::from_millis(850)).await;
    assert_eq!(files.current_files(), vec!["main.js"]);
    assert_eq!(files.current_selection().as_deref(), Some("main.js"));
    assert_eq!(files.current_buffer(), "console.log(1)");

    files.edit_buffer("main.js", "console.log(2)");
    sleep(Duration::from_millis(801)).await;

    assert_eq!(fs.writes_to("main.js"), vec!["console.log(2)"]);
    assert_eq!(
        fs.inner()
            .read_to_string(Path::new("main.js"))
            .await
            .unwrap(),
        "console.log(2)"
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_writes() {
    let (session, controller) = scripted();
    let workspace = controller
        .start(Arc::new(TerminalBuffer::new()))
        .await
        .unwrap();

    let files = workspace.files().clone();
    files.edit_buffer("main.js", "unsaved");
    assert_eq!(files.pending_writes(), 1);
    workspace.shutdown().await;

    sleep(Duration::from_secs(2)).await;
    assert!(session.scripted_fs().writes().is_empty());
    assert_eq!(files.pending_writes(), 0);
    let calls = session.scripted_fs().list_calls();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(session.scripted_fs().list_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_workspace_stops_shell_relay() {
    let (session, controller) = scripted();
    let term = Arc::new(TerminalBuffer::new());
    let workspace = controller.start(term.clone()).await.unwrap();
    let mut shell = session.take_spawned().unwrap();

    drop(workspace);
    tokio::task::yield_now().await;
    // The relay is gone, so the write either fails or goes nowhere
    let _ = shell.io.stdout.write_all(b"late").await;
    sleep(Duration::from_millis(10)).await;
    assert!(term.contents().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_memory_runtime_end_to_end() {
    let config = WorkspaceConfig::with_files(
        FileTree::new()
            .with_file("index.js", "console.log('hi')")
            .with_dir("src", FileTree::new()),
    );
    let controller = LifecycleController::new(Arc::new(MemoryRuntime::new()), config);
    let term = Arc::new(TerminalBuffer::new());
    let workspace = controller.start(term.clone()).await.unwrap();
    let shell = workspace.shell().unwrap();

    term.wait_for("❯ ").await;
    shell.send_keys(b"echo ok > notes.txt\r").unwrap();
    shell.send_keys(b"serve 3000\r").unwrap();

    let mut target = workspace.preview().target();
    target
        .wait_for(|t| t.as_deref() == Some("http://localhost:3000"))
        .await
        .unwrap();

    sleep(Duration::from_millis(850)).await;
    let files = workspace.files();
    assert_eq!(files.current_files(), vec!["index.js", "notes.txt", "src"]);
    assert_eq!(files.current_selection().as_deref(), Some("index.js"));
    assert_eq!(files.current_buffer(), "console.log('hi')");

    shell.send_keys(b"exit 4\r").unwrap();
    assert_eq!(shell.exited().await, Some(4));
    assert!(shell.send_keys(b"ls\r").is_err());
}
