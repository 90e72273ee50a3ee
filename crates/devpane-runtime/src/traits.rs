//! The capability set the devpane core consumes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use devpane_types::{FileTree, ServerReady};

use crate::error::RuntimeResult;
use crate::fs::Filesystem;
use crate::process::Process;

/// Shared handle to a booted session.
pub type SessionRef = Arc<dyn RuntimeSession>;

/// Something that can boot a sandboxed runtime.
///
/// Booting is called once per session; each successful call yields a fresh,
/// independent session.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Boot the runtime. No timeout is applied by callers.
    async fn boot(&self) -> RuntimeResult<SessionRef>;
}

/// A booted runtime instance.
///
/// Capabilities are only reachable through a session, so nothing can touch
/// the filesystem or spawn processes before boot has succeeded.
#[async_trait]
pub trait RuntimeSession: Send + Sync {
    /// Establish initial filesystem contents.
    async fn mount(&self, tree: &FileTree) -> RuntimeResult<()>;

    /// Spawn a process. Each call returns a new process instance.
    async fn spawn(&self, command: &str, args: &[String]) -> RuntimeResult<Process>;

    /// The session's filesystem.
    fn fs(&self) -> &dyn Filesystem;

    /// Subscribe to readiness notifications.
    ///
    /// Fires zero or more times over the session's lifetime.
    fn server_ready(&self) -> broadcast::Receiver<ServerReady>;
}
