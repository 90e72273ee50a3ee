//! devpane-runtime: the sandboxed runtime as seen by the devpane core.
//!
//! This crate provides:
//!
//! - **Traits**: [`Runtime`] (boot) and [`RuntimeSession`] (mount, spawn,
//!   filesystem, readiness events), the only surface the core consumes
//! - **Filesystem**: the async [`Filesystem`] trait and [`MemoryFs`]
//! - **Processes**: [`Process`] stream handles and [`process_pipe`] for
//!   implementors
//! - **MemoryRuntime**: an in-process runtime with a builtin `jsh` line
//!   shell, used by the headless front end and by tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  boot()  ┌──────────────────────────────────────────┐
//! │   Runtime    │─────────▶│             RuntimeSession               │
//! └──────────────┘          │  ┌──────────┐ ┌──────────┐ ┌───────────┐ │
//!                           │  │    fs    │ │  spawn   │ │server_rdy │ │
//!                           │  │(Filesys.)│ │(Process) │ │(broadcast)│ │
//!                           │  └──────────┘ └──────────┘ └───────────┘ │
//!                           └──────────────────────────────────────────┘
//! ```

pub mod error;
pub mod fs;
pub mod memory;
pub mod mount;
pub mod process;
mod shell;
pub mod traits;

pub use error::{RuntimeError, RuntimeResult};
pub use fs::{DirEntry, EntryType, Filesystem, MemoryFs, Metadata};
pub use memory::{MemoryRuntime, MemorySession};
pub use mount::mount_tree;
pub use process::{process_pipe, ExitWaiter, Process, ProcessIo, PROCESS_PIPE_SIZE};
pub use traits::{Runtime, RuntimeSession, SessionRef};
