//! Mounting a [`FileTree`] onto a [`Filesystem`].

use std::path::Path;

use devpane_types::{FileNode, FileTree};

use crate::error::{RuntimeError, RuntimeResult};
use crate::fs::Filesystem;

/// Materialize `tree` at the root of `fs`.
///
/// Directories are created before their children. Existing files with the
/// same path are overwritten; everything else in `fs` is left alone.
pub async fn mount_tree(fs: &dyn Filesystem, tree: &FileTree) -> RuntimeResult<()> {
    for (path, node) in tree.walk() {
        let result = match node {
            FileNode::Directory(_) => fs.mkdir(Path::new(&path)).await,
            FileNode::File { contents } => fs.write(Path::new(&path), contents.as_bytes()).await,
        };
        result.map_err(|source| RuntimeError::Mount { path, source })?;
    }
    Ok(())
}
