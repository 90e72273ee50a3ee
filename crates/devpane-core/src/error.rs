//! Errors surfaced by the orchestration layer.
//!
//! Most failures in a running workspace are deliberately local: a failed
//! listing tick, read, write or spawn is logged and absorbed by the component
//! that hit it. Only start-up failures and writes into a dead shell reach the
//! caller.

use devpane_runtime::RuntimeError;
use devpane_types::BootState;
use thiserror::Error;

/// Failure to bring a workspace up.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start` was called on a controller that already left `NotBooted`.
    #[error("workspace already started (state: {0})")]
    AlreadyStarted(BootState),

    /// The runtime refused to boot. Terminal for this controller.
    #[error("runtime boot failed: {0}")]
    Boot(#[source] RuntimeError),

    /// The initial file tree could not be mounted.
    #[error("mounting initial files failed: {0}")]
    Mount(#[source] RuntimeError),
}

/// Failure to feed the shell.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The shell exited or its input stream closed.
    #[error("shell input closed")]
    Closed,
}
