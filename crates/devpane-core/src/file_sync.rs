//! File list polling, active-file loading and debounced writes.
//!
//! ```text
//!   poll (every 800ms) ──▶ fs.list(root) ──▶ files ──▶ default selection (once)
//!                                                          │
//!   select_file(p) ──▶ selection ──▶ load(p) ──▶ fs.read(p) ──▶ buffer
//!                                      (latest load only)
//!
//!   edit_buffer(p, c) ──▶ buffer (now)
//!                    └──▶ PendingWrite[p] ──(800ms idle)──▶ fs.write(p, c)
//!                         (a newer edit to p cancels and replaces it)
//! ```
//!
//! Published state lives in `watch` channels; the presentation layer holds
//! receivers. Polls only ever replace the listing. The buffer changes on
//! selection, on a completed load, or on an edit, never on a poll.
//!
//! Reconciliation between loads and pending writes: a path with a pending
//! write is never read back from the filesystem. A write stays pending until
//! the filesystem has accepted it, not just until its debounce expires.
//! Selecting such a path loads the pending content instead, and editing a
//! path discards any load of it still in flight.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use devpane_runtime::{Filesystem, SessionRef};

use crate::config::WorkspaceConfig;

/// A write that has not landed yet: waiting out its debounce window or
/// in flight to the filesystem.
#[derive(Debug)]
struct PendingWrite {
    /// Distinguishes this write from the one that superseded it.
    id: u64,
    content: String,
    cancel: CancellationToken,
}

struct SyncShared {
    /// The session every read and write in this engine targets.
    session: SessionRef,
    root: PathBuf,
    debounce: Duration,
    files: watch::Sender<Vec<String>>,
    selection: watch::Sender<Option<String>>,
    buffer: watch::Sender<String>,
    /// Bumped by every load and edit; a read applies only if it is still current.
    load_seq: AtomicU64,
    next_write_id: AtomicU64,
    pending: Mutex<HashMap<String, PendingWrite>>,
    /// Serializes flushes per path so writes land in edit order. Entries
    /// exist only while some flush of that path holds or awaits the lock.
    flush_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    cancel: CancellationToken,
}

/// Keeps the file list, active selection and editor buffer in step with the
/// runtime's filesystem.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct FileSyncEngine {
    shared: Arc<SyncShared>,
}

impl std::fmt::Debug for FileSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSyncEngine")
            .field("root", &self.shared.root)
            .field("selection", &*self.shared.selection.borrow())
            .field("pending_writes", &self.pending_writes())
            .finish()
    }
}

impl FileSyncEngine {
    /// Create an engine bound to `session`.
    ///
    /// Nothing runs until [`start_polling`](Self::start_polling). Cancelling
    /// `cancel` stops the poll loop, every pending write and any load in
    /// flight.
    pub fn new(session: SessionRef, config: &WorkspaceConfig, cancel: CancellationToken) -> Self {
        Self {
            shared: Arc::new(SyncShared {
                session,
                root: PathBuf::from(&config.root),
                debounce: config.write_debounce(),
                files: watch::Sender::new(Vec::new()),
                selection: watch::Sender::new(None),
                buffer: watch::Sender::new(String::new()),
                load_seq: AtomicU64::new(0),
                next_write_id: AtomicU64::new(0),
                pending: Mutex::new(HashMap::new()),
                flush_locks: Mutex::new(HashMap::new()),
                cancel,
            }),
        }
    }

    /// Spawn the fixed-interval listing poll.
    ///
    /// The first tick fires one `period` after the call. A failed tick keeps
    /// the previous listing; the loop only stops on cancellation.
    pub fn start_polling(&self, period: Duration) -> JoinHandle<()> {
        let period = period.max(Duration::from_millis(1));
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = engine.shared.cancel.cancelled() => break,
                    _ = ticker.tick() => engine.refresh().await,
                }
            }
            tracing::debug!("file poll stopped");
        })
    }

    /// Ordered names in the root directory.
    pub async fn list_files(&self) -> std::io::Result<Vec<String>> {
        let entries = self.shared.session.fs().list(&self.shared.root).await?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    /// Run one poll tick now.
    pub async fn refresh(&self) {
        let names = match self.list_files().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(root = %self.shared.root.display(), error = %e, "listing failed; keeping previous list");
                return;
            }
        };

        let mut defaulted = None;
        self.shared.selection.send_if_modified(|selection| {
            if selection.is_some() {
                return false;
            }
            match names.first() {
                Some(first) => {
                    *selection = Some(first.clone());
                    defaulted = Some(first.clone());
                    true
                }
                None => false,
            }
        });
        self.shared.files.send_if_modified(|files| {
            if *files == names {
                return false;
            }
            *files = names;
            true
        });

        if let Some(path) = defaulted {
            tracing::debug!(%path, "default selection");
            self.load(path);
        }
    }

    /// Make `path` the active file and load its content into the buffer.
    pub fn select_file(&self, path: impl Into<String>) {
        let path = path.into();
        self.shared.selection.send_replace(Some(path.clone()));
        self.load(path);
    }

    /// Apply an edit: the buffer updates now, the write after the debounce.
    ///
    /// The buffer only follows edits to the active file (or when nothing is
    /// selected). A pending write for the same path is superseded.
    pub fn edit_buffer(&self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let content = content.into();

        let is_active = self
            .shared
            .selection
            .borrow()
            .as_deref()
            .is_none_or(|selected| selected == path);
        if is_active {
            // Any read still in flight is older than this edit.
            self.shared.load_seq.fetch_add(1, Ordering::SeqCst);
            self.shared.buffer.send_replace(content.clone());
        }

        self.schedule_write(path, content);
    }

    /// Receiver for the file listing.
    pub fn files(&self) -> watch::Receiver<Vec<String>> {
        self.shared.files.subscribe()
    }

    /// Receiver for the active selection.
    pub fn selection(&self) -> watch::Receiver<Option<String>> {
        self.shared.selection.subscribe()
    }

    /// Receiver for the editor buffer.
    pub fn buffer(&self) -> watch::Receiver<String> {
        self.shared.buffer.subscribe()
    }

    pub fn current_files(&self) -> Vec<String> {
        self.shared.files.borrow().clone()
    }

    pub fn current_selection(&self) -> Option<String> {
        self.shared.selection.borrow().clone()
    }

    pub fn current_buffer(&self) -> String {
        self.shared.buffer.borrow().clone()
    }

    /// Number of writes that have not landed yet.
    pub fn pending_writes(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingWrite>> {
        self.shared.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load(&self, path: String) {
        let seq = self.shared.load_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let pending = self.pending().get(&path).map(|w| w.content.clone());
        if let Some(content) = pending {
            tracing::debug!(%path, "loading pending content instead of reading");
            self.shared.buffer.send_replace(content);
            return;
        }

        let engine = self.clone();
        tokio::spawn(async move {
            let read = tokio::select! {
                biased;
                _ = engine.shared.cancel.cancelled() => return,
                read = engine.shared.session.fs().read_to_string(Path::new(&path)) => read,
            };
            match read {
                Ok(content) => engine.apply_load(seq, &path, content),
                Err(e) => tracing::warn!(%path, error = %e, "read failed; buffer unchanged"),
            }
        });
    }

    /// Publish a finished read if nothing newer happened meanwhile.
    fn apply_load(&self, seq: u64, path: &str, content: String) {
        let current = self.shared.load_seq.load(Ordering::SeqCst) == seq;
        let still_selected = self.shared.selection.borrow().as_deref() == Some(path);
        if current && still_selected {
            self.shared.buffer.send_replace(content);
        } else {
            tracing::debug!(%path, "discarding stale read");
        }
    }

    fn schedule_write(&self, path: String, content: String) {
        let id = self.shared.next_write_id.fetch_add(1, Ordering::SeqCst);
        let cancel = self.shared.cancel.child_token();

        let superseded = self.pending().insert(
            path.clone(),
            PendingWrite {
                id,
                content,
                cancel: cancel.clone(),
            },
        );
        if let Some(old) = superseded {
            old.cancel.cancel();
        }

        let engine = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    engine.discard(id, &path);
                    return;
                }
                _ = tokio::time::sleep(engine.shared.debounce) => {}
            }
            engine.flush(id, path, cancel).await;
        });
    }

    /// Drop the pending entry for `path` if it is still write `id`.
    fn discard(&self, id: u64, path: &str) {
        let mut pending = self.pending();
        if pending.get(path).is_some_and(|w| w.id == id) {
            pending.remove(path);
        }
    }

    async fn flush(&self, id: u64, path: String, cancel: CancellationToken) {
        let lock = self.flush_lock(&path);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.discard(id, &path);
            }
            _guard = lock.lock() => self.write_pending(id, &path).await,
        }
        self.release_flush_lock(&path, lock);
    }

    /// Write pending entry `id` for `path`, keeping it visible to loads until
    /// the filesystem has it.
    async fn write_pending(&self, id: u64, path: &str) {
        let content = match self.pending().get(path) {
            Some(w) if w.id == id => w.content.clone(),
            _ => return,
        };

        let written = self
            .shared
            .session
            .fs()
            .write(Path::new(path), content.as_bytes())
            .await;
        // A newer edit may have replaced the entry meanwhile; that one stays.
        self.discard(id, path);

        match written {
            Ok(()) => tracing::debug!(%path, bytes = content.len(), "flushed edit"),
            Err(e) => tracing::warn!(%path, error = %e, "write failed; edit dropped"),
        }
    }

    fn flush_lock(&self, path: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.flush_locks()
            .entry(path.to_string())
            .or_default()
            .clone()
    }

    /// Forget the lock for `path` once no other flush is using it.
    fn release_flush_lock(&self, path: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.flush_locks();
        // Ours plus the map's
        if Arc::strong_count(&lock) == 2 {
            locks.remove(path);
        }
    }

    fn flush_locks(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.shared.flush_locks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devpane_runtime::{MemoryRuntime, Runtime};

    async fn engine_over_memory() -> (FileSyncEngine, SessionRef) {
        let session = MemoryRuntime::new().boot().await.unwrap();
        let engine = FileSyncEngine::new(
            session.clone(),
            &WorkspaceConfig::default(),
            CancellationToken::new(),
        );
        (engine, session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_publishes_listing_and_defaults_selection() {
        let (engine, session) = engine_over_memory().await;
        session.fs().write(Path::new("b.js"), b"b").await.unwrap();
        session.fs().write(Path::new("a.js"), b"a").await.unwrap();

        engine.refresh().await;

        assert_eq!(engine.current_files(), vec!["a.js", "b.js"]);
        assert_eq!(engine.current_selection().as_deref(), Some("a.js"));

        let mut buffer = engine.buffer();
        buffer.wait_for(|b| b == "a").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_of_inactive_path_leaves_buffer() {
        let (engine, session) = engine_over_memory().await;
        session.fs().write(Path::new("a.js"), b"a").await.unwrap();
        session.fs().write(Path::new("b.js"), b"b").await.unwrap();
        engine.select_file("a.js");
        engine.buffer().wait_for(|b| b == "a").await.unwrap();

        engine.edit_buffer("b.js", "b2");
        assert_eq!(engine.current_buffer(), "a");
        assert_eq!(engine.pending_writes(), 1);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(
            session.fs().read_to_string(Path::new("b.js")).await.unwrap(),
            "b2"
        );
        assert_eq!(engine.pending_writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_writes() {
        let session = MemoryRuntime::new().boot().await.unwrap();
        session.fs().write(Path::new("a.js"), b"a").await.unwrap();
        let cancel = CancellationToken::new();
        let engine = FileSyncEngine::new(session.clone(), &WorkspaceConfig::default(), cancel.clone());

        engine.edit_buffer("a.js", "never");
        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            session.fs().read_to_string(Path::new("a.js")).await.unwrap(),
            "a"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_locks_released_after_writes() {
        let (engine, _session) = engine_over_memory().await;
        engine.edit_buffer("a.js", "a");
        engine.edit_buffer("b.js", "b");

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(engine.pending_writes(), 0);
        assert!(engine.flush_locks().is_empty());
    }
}
