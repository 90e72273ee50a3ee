//! Scripted runtime and session.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use devpane_runtime::{
    mount_tree, process_pipe, Filesystem, Process, ProcessIo, Runtime, RuntimeError,
    RuntimeResult, RuntimeSession, SessionRef,
};
use devpane_types::{FileTree, ServerReady};

use crate::fs::ScriptedFs;

/// A capability use, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Mount,
    Spawn(String),
    Subscribe,
}

/// The program side of a process spawned through a [`ScriptedSession`].
#[derive(Debug)]
pub struct SpawnedProcess {
    pub command: String,
    pub args: Vec<String>,
    pub io: ProcessIo,
}

/// Boots [`ScriptedSession`]s, or fails to.
#[derive(Debug, Default)]
pub struct ScriptedRuntime {
    boot_error: Option<String>,
    boots: AtomicUsize,
    session: Mutex<Option<Arc<ScriptedSession>>>,
}

impl ScriptedRuntime {
    /// A runtime whose every boot succeeds with a new session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime whose boot always fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            boot_error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// A runtime that boots into `session` (prepared ahead of time).
    pub fn with_session(session: Arc<ScriptedSession>) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            ..Self::default()
        }
    }

    pub fn boots(&self) -> usize {
        self.boots.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Runtime for ScriptedRuntime {
    async fn boot(&self) -> RuntimeResult<SessionRef> {
        self.boots.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.boot_error {
            return Err(RuntimeError::Boot(reason.clone()));
        }
        let prepared = self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let session: SessionRef = prepared.unwrap_or_else(|| Arc::new(ScriptedSession::new()));
        Ok(session)
    }
}

/// A session whose capabilities are observable and steerable.
#[derive(Debug)]
pub struct ScriptedSession {
    fs: ScriptedFs,
    ready: broadcast::Sender<ServerReady>,
    calls: Mutex<Vec<Call>>,
    spawned: Mutex<Vec<SpawnedProcess>>,
    fail_mount: AtomicBool,
    fail_spawn: AtomicBool,
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSession {
    pub fn new() -> Self {
        let (ready, _) = broadcast::channel(16);
        Self {
            fs: ScriptedFs::new(),
            ready,
            calls: Mutex::new(Vec::new()),
            spawned: Mutex::new(Vec::new()),
            fail_mount: AtomicBool::new(false),
            fail_spawn: AtomicBool::new(false),
        }
    }

    pub fn scripted_fs(&self) -> &ScriptedFs {
        &self.fs
    }

    pub fn set_fail_mount(&self, fail: bool) {
        self.fail_mount.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Emit a readiness notification.
    pub fn announce(&self, port: u16, url: &str) {
        let _ = self.ready.send(ServerReady::new(port, url));
    }

    /// Capability uses so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Take the program side of the oldest spawned process not yet taken.
    pub fn take_spawned(&self) -> Option<SpawnedProcess> {
        let mut spawned = self.spawned.lock().unwrap_or_else(|e| e.into_inner());
        if spawned.is_empty() {
            None
        } else {
            Some(spawned.remove(0))
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }
}

#[async_trait]
impl RuntimeSession for ScriptedSession {
    async fn mount(&self, tree: &FileTree) -> RuntimeResult<()> {
        self.record(Call::Mount);
        if self.fail_mount.load(Ordering::SeqCst) {
            return Err(RuntimeError::Mount {
                path: String::new(),
                source: std::io::Error::other("filesystem unavailable"),
            });
        }
        // Straight onto the backing store so mounts stay out of the write journal
        mount_tree(self.fs.inner(), tree).await
    }

    async fn spawn(&self, command: &str, args: &[String]) -> RuntimeResult<Process> {
        self.record(Call::Spawn(command.to_string()));
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(RuntimeError::Spawn {
                command: command.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        let (process, io) = process_pipe(4096);
        self.spawned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SpawnedProcess {
                command: command.to_string(),
                args: args.to_vec(),
                io,
            });
        Ok(process)
    }

    fn fs(&self) -> &dyn Filesystem {
        &self.fs
    }

    fn server_ready(&self) -> broadcast::Receiver<ServerReady> {
        self.record(Call::Subscribe);
        self.ready.subscribe()
    }
}
