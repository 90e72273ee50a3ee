//! In-process runtime.
//!
//! `MemoryRuntime` boots sessions backed by a fresh [`MemoryFs`] each time.
//! Sessions understand one program, the builtin `jsh` line shell (also
//! reachable as `sh`), and broadcast readiness when `serve` runs in it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use devpane_types::{FileTree, ServerReady};

use crate::error::{RuntimeError, RuntimeResult};
use crate::fs::{Filesystem, MemoryFs};
use crate::mount::mount_tree;
use crate::process::{process_pipe, Process, PROCESS_PIPE_SIZE};
use crate::shell::Jsh;
use crate::traits::{Runtime, RuntimeSession, SessionRef};

/// Capacity of the readiness broadcast. Slow subscribers skip ahead.
const READY_CHANNEL_CAPACITY: usize = 16;

/// Boots [`MemorySession`]s.
#[derive(Debug, Default, Clone)]
pub struct MemoryRuntime;

impl MemoryRuntime {
    pub fn new() -> Self {
        Self
    }

    /// Boot and keep the concrete session type.
    pub fn boot_memory(&self) -> Arc<MemorySession> {
        Arc::new(MemorySession::new())
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    #[tracing::instrument(level = "debug", skip_all)]
    async fn boot(&self) -> RuntimeResult<SessionRef> {
        let session: SessionRef = self.boot_memory();
        tracing::debug!("memory runtime booted");
        Ok(session)
    }
}

/// A booted in-memory runtime.
#[derive(Debug)]
pub struct MemorySession {
    fs: Arc<MemoryFs>,
    ready: broadcast::Sender<ServerReady>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    pub fn new() -> Self {
        let (ready, _) = broadcast::channel(READY_CHANNEL_CAPACITY);
        Self {
            fs: Arc::new(MemoryFs::new()),
            ready,
        }
    }

    /// Announce a server, as `serve` in the shell does.
    ///
    /// Returns the number of subscribers that will see it.
    pub fn announce(&self, ready: ServerReady) -> usize {
        self.ready.send(ready).unwrap_or(0)
    }
}

#[async_trait]
impl RuntimeSession for MemorySession {
    async fn mount(&self, tree: &FileTree) -> RuntimeResult<()> {
        mount_tree(self.fs.as_ref(), tree).await
    }

    async fn spawn(&self, command: &str, args: &[String]) -> RuntimeResult<Process> {
        match command {
            "jsh" | "sh" => {
                if !args.is_empty() {
                    return Err(RuntimeError::Spawn {
                        command: command.to_string(),
                        reason: "jsh takes no arguments".to_string(),
                    });
                }
                let (process, io) = process_pipe(PROCESS_PIPE_SIZE);
                tokio::spawn(Jsh::new(self.fs.clone(), self.ready.clone()).run(io));
                tracing::debug!(command, "spawned builtin shell");
                Ok(process)
            }
            other => Err(RuntimeError::CommandNotFound(other.to_string())),
        }
    }

    fn fs(&self) -> &dyn Filesystem {
        self.fs.as_ref()
    }

    fn server_ready(&self) -> broadcast::Receiver<ServerReady> {
        self.ready.subscribe()
    }
}
