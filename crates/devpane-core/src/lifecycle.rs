//! Boot sequencing and the live workspace.
//!
//! ```text
//!   NotBooted ──start──▶ Booting ──ok──▶ Ready ──▶ mount ──▶ spawn shell
//!                           │                               ├─▶ poll files
//!                           └──err──▶ BootFailed            └─▶ follow preview
//! ```
//!
//! The runtime's capabilities only exist on the session returned by boot, so
//! nothing can reach the filesystem, spawn or readiness events earlier.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use devpane_runtime::{Runtime, SessionRef};
use devpane_types::BootState;

use crate::config::WorkspaceConfig;
use crate::error::LifecycleError;
use crate::file_sync::FileSyncEngine;
use crate::preview::PreviewRouter;
use crate::shell_bridge::ShellBridge;
use crate::terminal::TerminalSink;

/// Drives one runtime session from boot to a running [`Workspace`].
pub struct LifecycleController {
    runtime: Arc<dyn Runtime>,
    config: WorkspaceConfig,
    state: watch::Sender<BootState>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("workspace", &self.config.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    pub fn new(runtime: Arc<dyn Runtime>, config: WorkspaceConfig) -> Self {
        Self {
            runtime,
            config,
            state: watch::Sender::new(BootState::NotBooted),
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Current boot state.
    pub fn state(&self) -> BootState {
        *self.state.borrow()
    }

    /// Receiver that observes every boot state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<BootState> {
        self.state.subscribe()
    }

    /// Boot the runtime and bring the workspace up.
    ///
    /// Only the first call boots. Boot failure is terminal for this
    /// controller. A mount failure aborts start-up before anything else runs;
    /// a spawn failure leaves the workspace running without a shell.
    #[tracing::instrument(level = "info", skip_all, fields(workspace = %self.config.name), err)]
    pub async fn start(&self, terminal: Arc<dyn TerminalSink>) -> Result<Workspace, LifecycleError> {
        let mut previous = BootState::NotBooted;
        let claimed = self.state.send_if_modified(|state| {
            previous = *state;
            if *state == BootState::NotBooted {
                *state = BootState::Booting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(LifecycleError::AlreadyStarted(previous));
        }

        tracing::debug!("booting runtime");
        let session = match self.runtime.boot().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "runtime boot failed");
                self.state.send_replace(BootState::BootFailed);
                return Err(LifecycleError::Boot(e));
            }
        };
        self.state.send_replace(BootState::Ready);
        tracing::info!("runtime ready");

        session
            .mount(&self.config.files)
            .await
            .map_err(LifecycleError::Mount)?;
        tracing::debug!(entries = self.config.files.len(), "initial files mounted");

        let cancel = CancellationToken::new();

        let shell = match ShellBridge::spawn(&session, &self.config, terminal, cancel.child_token()).await {
            Ok(shell) => Some(shell),
            Err(e) => {
                tracing::warn!(shell = %self.config.shell, error = %e, "shell spawn failed; continuing without a terminal");
                None
            }
        };

        let files = FileSyncEngine::new(session.clone(), &self.config, cancel.child_token());
        let poll = files.start_polling(self.config.poll_interval());

        let preview = PreviewRouter::new();
        let follow = preview.subscribe(&session, cancel.child_token());

        Ok(Workspace {
            session,
            cancel,
            files,
            shell,
            preview,
            tasks: vec![poll, follow],
        })
    }
}

/// A running workspace.
///
/// Dropping it (or calling [`shutdown`](Self::shutdown)) stops polling,
/// cancels pending writes and detaches the shell and preview.
pub struct Workspace {
    session: SessionRef,
    cancel: CancellationToken,
    files: FileSyncEngine,
    shell: Option<ShellBridge>,
    preview: PreviewRouter,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("files", &self.files)
            .field("shell", &self.shell)
            .field("preview", &self.preview)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn session(&self) -> &SessionRef {
        &self.session
    }

    pub fn files(&self) -> &FileSyncEngine {
        &self.files
    }

    /// The shell bridge, absent if the spawn failed.
    pub fn shell(&self) -> Option<&ShellBridge> {
        self.shell.as_ref()
    }

    pub fn preview(&self) -> &PreviewRouter {
        &self.preview
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Cancel every background activity and wait for the poll and preview
    /// tasks to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "workspace task ended abnormally");
            }
        }
        tracing::info!("workspace shut down");
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
