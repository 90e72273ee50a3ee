//! Mountable file trees.
//!
//! The serialized shape matches the runtime's mount format:
//!
//! ```json
//! {
//!   "main.js": { "file": { "contents": "console.log(1)" } },
//!   "src": { "directory": { "lib.js": { "file": { "contents": "" } } } }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node in a [`FileTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNode {
    /// A text file.
    File { contents: String },
    /// A nested directory.
    Directory(FileTree),
}

/// Initial contents to mount into a runtime's filesystem.
///
/// Names are single path components; nesting goes through
/// [`FileNode::Directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTree {
    entries: BTreeMap<String, FileNode>,
}

impl FileTree {
    /// An empty tree (mounting it leaves the filesystem untouched).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any node with the same name.
    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(
            name,
            FileNode::File {
                contents: contents.into(),
            },
        );
        self
    }

    /// Add a directory, replacing any node with the same name.
    pub fn with_dir(mut self, name: impl Into<String>, tree: FileTree) -> Self {
        self.insert(name, FileNode::Directory(tree));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, node: FileNode) {
        self.entries.insert(name.into(), node);
    }

    pub fn get(&self, name: &str) -> Option<&FileNode> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Flatten into `(relative path, node)` pairs, parents before children.
    ///
    /// Paths use `/` separators and never start with one.
    pub fn walk(&self) -> Vec<(String, &FileNode)> {
        let mut out = Vec::new();
        self.walk_into("", &mut out);
        out
    }

    fn walk_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a FileNode)>) {
        for (name, node) in &self.entries {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            out.push((path.clone(), node));
            if let FileNode::Directory(children) = node {
                children.walk_into(&path, out);
            }
        }
    }
}
