//! Integration tests for the in-memory runtime through its trait surface.

use std::path::Path;
use std::time::Duration;

use devpane_runtime::{Filesystem, MemoryRuntime, Runtime, RuntimeError, RuntimeSession};
use devpane_types::{FileTree, ServerReady};
use rstest::rstest;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn test_boot_mount_and_list() {
    let session = MemoryRuntime::new().boot().await.unwrap();
    let tree = FileTree::new().with_file("main.js", "console.log(1)");
    session.mount(&tree).await.unwrap();

    let entries = session.fs().list(Path::new(".")).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "main.js");
    assert_eq!(
        session.fs().read_to_string(Path::new("main.js")).await.unwrap(),
        "console.log(1)"
    );
}

#[tokio::test]
async fn test_each_boot_is_a_fresh_session() {
    let runtime = MemoryRuntime::new();
    let first = runtime.boot().await.unwrap();
    first.fs().write(Path::new("a.txt"), b"a").await.unwrap();

    let second = runtime.boot().await.unwrap();
    assert!(!second.fs().exists(Path::new("a.txt")).await);
}

#[rstest]
#[case("node")]
#[case("npm")]
#[tokio::test]
async fn test_spawn_unknown_command(#[case] command: &str) {
    let session = MemoryRuntime::new().boot().await.unwrap();
    match session.spawn(command, &[]).await {
        Err(RuntimeError::CommandNotFound(name)) => assert_eq!(name, command),
        other => panic!("expected CommandNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_shell_sees_mounted_files_and_announces_servers() {
    let session = MemoryRuntime::new().boot().await.unwrap();
    session
        .mount(&FileTree::new().with_file("index.js", "serve()"))
        .await
        .unwrap();
    let mut ready = session.server_ready();

    let mut shell = session.spawn("jsh", &[]).await.unwrap();
    shell.input.write_all(b"cat index.js\rserve 8080\rexit\r").await.unwrap();

    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(2), shell.output.read_to_end(&mut out))
        .await
        .expect("shell did not exit")
        .unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("serve()"));
    assert!(out.contains("listening on http://localhost:8080"));

    assert_eq!(ready.recv().await.unwrap(), ServerReady::localhost(8080));
    assert_eq!(shell.exit.wait().await, Some(0));
}
