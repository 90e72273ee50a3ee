//! Routes server readiness to the preview pane.
//!
//! The latest announced URL wins; there is no history and no reachability
//! check. A lagging receiver skips to the newest events.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use devpane_runtime::SessionRef;

/// Holds the current preview target.
#[derive(Debug, Clone)]
pub struct PreviewRouter {
    target: Arc<watch::Sender<Option<String>>>,
}

impl Default for PreviewRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewRouter {
    /// A router with no target.
    pub fn new() -> Self {
        Self {
            target: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Follow `session`'s readiness events until `cancel` fires or the
    /// session stops announcing.
    pub fn subscribe(&self, session: &SessionRef, cancel: CancellationToken) -> JoinHandle<()> {
        let mut ready = session.server_ready();
        let target = self.target.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = ready.recv() => event,
                };
                match event {
                    Ok(event) => {
                        tracing::info!(port = event.port, url = %event.url, "server ready");
                        target.send_replace(Some(event.url));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "readiness events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Receiver for the preview target.
    pub fn target(&self) -> watch::Receiver<Option<String>> {
        self.target.subscribe()
    }

    /// The current target URL, if any server has announced itself.
    pub fn current(&self) -> Option<String> {
        self.target.borrow().clone()
    }
}
