//! Test doubles for devpane.
//!
//! [`ScriptedRuntime`] boots [`ScriptedSession`]s whose filesystem and
//! process behavior tests can steer: queued listings, per-path read delays,
//! failing writes, captured shell processes, and a call journal for checking
//! the order in which capabilities were first touched.

mod fs;
mod runtime;

pub use fs::{ListScript, ScriptedFs, WriteRecord};
pub use runtime::{Call, ScriptedRuntime, ScriptedSession, SpawnedProcess};
