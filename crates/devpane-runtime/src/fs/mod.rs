//! Virtual filesystem for runtime sessions.
//!
//! - **Filesystem**: the async trait every session exposes
//! - **MemoryFs**: ephemeral in-memory storage backing `MemorySession`

mod memory;
mod traits;

pub use memory::MemoryFs;
pub use traits::{DirEntry, EntryType, Filesystem, Metadata};
