//! Core VFS traits and types.

use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Type of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// Metadata about a file or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub entry_type: EntryType,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

impl Metadata {
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }
}

/// A directory entry returned by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name of the entry (not full path).
    pub name: String,
    pub entry_type: EntryType,
}

/// Abstract filesystem interface.
///
/// Paths are relative to the session root; a leading `/`, `.` and `..`
/// components are resolved by the implementation.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Read the entire contents of a file. Fails if the path is absent.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write a file, creating or truncating it.
    ///
    /// The parent directory must already exist.
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// List a directory in a stable order.
    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    async fn stat(&self, path: &Path) -> io::Result<Metadata>;

    /// Create a directory. The parent must exist; an existing directory is fine.
    async fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// Remove a file or empty directory.
    async fn remove(&self, path: &Path) -> io::Result<()>;

    /// Read a file and decode it as UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.stat(path).await.is_ok()
    }
}
