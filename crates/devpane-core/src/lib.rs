//! devpane-core: keeps an editor, a terminal and a preview pane in step with
//! a sandboxed runtime.
//!
//! # Architecture
//!
//! ```text
//!                   ┌──────────────────────┐
//!                   │ LifecycleController  │  boot ─▶ mount ─▶ start
//!                   └──────────┬───────────┘
//!                              │ Workspace (owns the cancellation root)
//!        ┌─────────────────────┼──────────────────────┐
//!        ▼                     ▼                      ▼
//!  FileSyncEngine         ShellBridge           PreviewRouter
//!  poll / load / write    stdin ▲ ▼ stdout      server_ready ─▶ url
//!        │                     │                      │
//!        └─────────────── RuntimeSession ─────────────┘
//! ```
//!
//! Every output the presentation layer reads is a `tokio::sync::watch`
//! receiver; every user intent is a plain method call.

pub mod config;
pub mod error;
pub mod file_sync;
pub mod lifecycle;
pub mod preview;
pub mod shell_bridge;
pub mod terminal;

pub use config::{TerminalConfig, WorkspaceConfig};
pub use error::{BridgeError, LifecycleError};
pub use file_sync::FileSyncEngine;
pub use lifecycle::{LifecycleController, Workspace};
pub use preview::PreviewRouter;
pub use shell_bridge::ShellBridge;
pub use terminal::{EolConverter, TerminalBuffer, TerminalSink};
