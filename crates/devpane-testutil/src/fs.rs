//! Steerable filesystem wrapper.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use devpane_runtime::{DirEntry, EntryType, Filesystem, MemoryFs, Metadata};

/// One scripted answer for `list`.
#[derive(Debug, Clone)]
pub enum ListScript {
    /// Report these names, in this order, as files.
    Names(Vec<String>),
    /// Fail the call as if the filesystem were unavailable.
    Fail,
}

impl ListScript {
    pub fn names(names: &[&str]) -> Self {
        ListScript::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

/// A write that reached the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub path: String,
    pub content: String,
}

/// `MemoryFs` plus knobs.
///
/// Queued [`ListScript`]s answer `list` calls first; once the queue is empty
/// the real listing is returned. Reads and writes of a path with a
/// configured delay sleep first (use paused tokio time for determinism).
#[derive(Debug, Default)]
pub struct ScriptedFs {
    inner: MemoryFs,
    listings: Mutex<VecDeque<ListScript>>,
    read_delays: Mutex<HashMap<PathBuf, Duration>>,
    write_delays: Mutex<HashMap<PathBuf, Duration>>,
    writes: Mutex<Vec<WriteRecord>>,
    fail_writes: AtomicBool,
    list_calls: AtomicUsize,
}

impl ScriptedFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, bypassing scripts and the write journal.
    pub fn inner(&self) -> &MemoryFs {
        &self.inner
    }

    pub fn push_listing(&self, script: ListScript) {
        lock(&self.listings).push_back(script);
    }

    pub fn set_read_delay(&self, path: &str, delay: Duration) {
        lock(&self.read_delays).insert(PathBuf::from(path), delay);
    }

    /// Make writes to `path` take `delay` before they land.
    pub fn set_write_delay(&self, path: &str, delay: Duration) {
        lock(&self.write_delays).insert(PathBuf::from(path), delay);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every write that went through this filesystem, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.writes).clone()
    }

    /// Writes that targeted `path`.
    pub fn writes_to(&self, path: &str) -> Vec<String> {
        lock(&self.writes)
            .iter()
            .filter(|w| w.path == path)
            .map(|w| w.content.clone())
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Filesystem for ScriptedFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let delay = lock(&self.read_delays).get(path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let delay = lock(&self.write_delays).get(path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::other("filesystem unavailable"));
        }
        self.inner.write(path, data).await?;
        lock(&self.writes).push(WriteRecord {
            path: path.to_string_lossy().into_owned(),
            content: String::from_utf8_lossy(data).into_owned(),
        });
        Ok(())
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let script = lock(&self.listings).pop_front();
        match script {
            Some(ListScript::Names(names)) => Ok(names
                .into_iter()
                .map(|name| DirEntry {
                    name,
                    entry_type: EntryType::File,
                })
                .collect()),
            Some(ListScript::Fail) => Err(io::Error::other("filesystem unavailable")),
            None => self.inner.list(path).await,
        }
    }

    async fn stat(&self, path: &Path) -> io::Result<Metadata> {
        self.inner.stat(path).await
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        self.inner.mkdir(path).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        self.inner.remove(path).await
    }
}
