//! Runtime errors.

use thiserror::Error;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by a runtime or one of its sessions.
///
/// Filesystem primitives use `io::Error` directly; this type covers the
/// session-level capabilities.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime could not be booted.
    #[error("boot failed: {0}")]
    Boot(String),

    /// Mounting the initial tree failed.
    #[error("mount failed at {path}: {source}")]
    Mount {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The requested program does not exist in the sandbox.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// Spawning a known program failed.
    #[error("spawn failed for {command}: {reason}")]
    Spawn { command: String, reason: String },

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
