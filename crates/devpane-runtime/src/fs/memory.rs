//! In-memory filesystem implementation.
//!
//! Backs every `MemorySession`. All data is lost when the session drops.

use super::traits::{DirEntry, EntryType, Filesystem, Metadata};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Directory,
}

/// In-memory filesystem.
///
/// Entries are kept in a `BTreeMap` keyed by normalized path, so directory
/// listings come out sorted by name. The root (empty path) always exists.
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a path: drop the root, resolve `.` and `..`.
    fn normalize(path: &Path) -> PathBuf {
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(s) => out.push(s),
                Component::ParentDir => {
                    out.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        out
    }

    fn lookup(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> Option<Node> {
        if path.as_os_str().is_empty() {
            return Some(Node::Directory);
        }
        nodes.get(path).cloned()
    }

    /// The parent of `path` must be an existing directory.
    fn check_parent(nodes: &BTreeMap<PathBuf, Node>, path: &Path, display: &Path) -> io::Result<()> {
        let parent = path.parent().unwrap_or(Path::new(""));
        match Self::lookup(nodes, parent) {
            Some(Node::Directory) => Ok(()),
            Some(Node::File(_)) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", parent.display()),
            )),
            None => Err(not_found(display)),
        }
    }

    fn read_lock(&self) -> io::Result<std::sync::RwLockReadGuard<'_, BTreeMap<PathBuf, Node>>> {
        self.nodes.read().map_err(|_| io::Error::other("lock poisoned"))
    }

    fn write_lock(&self) -> io::Result<std::sync::RwLockWriteGuard<'_, BTreeMap<PathBuf, Node>>> {
        self.nodes.write().map_err(|_| io::Error::other("lock poisoned"))
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("not found: {}", path.display()))
}

#[async_trait]
impl Filesystem for MemoryFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let key = Self::normalize(path);
        let nodes = self.read_lock()?;
        match Self::lookup(&nodes, &key) {
            Some(Node::File(data)) => Ok(data),
            Some(Node::Directory) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.write_lock()?;
        if key.as_os_str().is_empty() || matches!(nodes.get(&key), Some(Node::Directory)) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            ));
        }
        Self::check_parent(&nodes, &key, path)?;
        nodes.insert(key, Node::File(data.to_vec()));
        Ok(())
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let key = Self::normalize(path);
        let nodes = self.read_lock()?;
        match Self::lookup(&nodes, &key) {
            Some(Node::Directory) => {}
            Some(Node::File(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ));
            }
            None => return Err(not_found(path)),
        }

        let entries = nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(key.as_path()))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                let entry_type = match node {
                    Node::File(_) => EntryType::File,
                    Node::Directory => EntryType::Directory,
                };
                Some(DirEntry { name, entry_type })
            })
            .collect();
        Ok(entries)
    }

    async fn stat(&self, path: &Path) -> io::Result<Metadata> {
        let key = Self::normalize(path);
        let nodes = self.read_lock()?;
        match Self::lookup(&nodes, &key) {
            Some(Node::File(data)) => Ok(Metadata {
                entry_type: EntryType::File,
                size: data.len() as u64,
            }),
            Some(Node::Directory) => Ok(Metadata {
                entry_type: EntryType::Directory,
                size: 0,
            }),
            None => Err(not_found(path)),
        }
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        let key = Self::normalize(path);
        let mut nodes = self.write_lock()?;
        match Self::lookup(&nodes, &key) {
            Some(Node::Directory) => return Ok(()),
            Some(Node::File(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("file exists: {}", path.display()),
                ));
            }
            None => {}
        }
        Self::check_parent(&nodes, &key, path)?;
        nodes.insert(key, Node::Directory);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        let key = Self::normalize(path);
        if key.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove root directory",
            ));
        }
        let mut nodes = self.write_lock()?;
        if let Some(Node::Directory) = nodes.get(&key)
            && nodes.keys().any(|k| k.parent() == Some(key.as_path()))
        {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("directory not empty: {}", path.display()),
            ));
        }
        nodes.remove(&key).map(|_| ()).ok_or_else(|| not_found(path))
    }
}
