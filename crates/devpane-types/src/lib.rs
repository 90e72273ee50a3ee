//! Pure data types for devpane: file trees, boot state and readiness events.
//!
//! This crate is a leaf dependency with no async runtime and no I/O, so a
//! presentation layer can depend on it without pulling in tokio.

pub mod event;
pub mod state;
pub mod tree;

// Flat re-exports for convenience
pub use event::*;
pub use state::*;
pub use tree::*;
