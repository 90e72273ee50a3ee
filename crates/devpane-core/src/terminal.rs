//! The terminal side of the shell bridge.
//!
//! The emulator itself is out of scope; the bridge only needs somewhere to
//! append output bytes ([`TerminalSink`]). [`TerminalBuffer`] is the
//! in-memory sink used by headless front ends and tests.

use std::borrow::Cow;
use std::sync::Mutex;

use tokio::sync::watch;

/// Append-only destination for shell output.
///
/// Chunks arrive in the order the process produced them.
pub trait TerminalSink: Send + Sync {
    fn write(&self, chunk: &[u8]);
}

/// Records everything written to it.
#[derive(Debug)]
pub struct TerminalBuffer {
    chunks: Mutex<Vec<Vec<u8>>>,
    /// Total bytes written so far; lets waiters wake on new output.
    written: watch::Sender<usize>,
}

impl Default for TerminalBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBuffer {
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(Vec::new()),
            written: watch::Sender::new(0),
        }
    }

    /// Every chunk, in arrival order.
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.chunks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Everything written, concatenated.
    pub fn contents(&self) -> Vec<u8> {
        self.chunks().concat()
    }

    pub fn contents_lossy(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    /// Wait until the accumulated output contains `needle`.
    pub async fn wait_for(&self, needle: &str) {
        let mut rx = self.written.subscribe();
        loop {
            if self.contents_lossy().contains(needle) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl TerminalSink for TerminalBuffer {
    fn write(&self, chunk: &[u8]) {
        self.chunks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(chunk.to_vec());
        self.written.send_modify(|n| *n += chunk.len());
    }
}

/// Rewrites lone `\n` as `\r\n`.
///
/// Carries the last byte across calls so a `\r` ending one chunk and a `\n`
/// starting the next stay a single line break.
#[derive(Debug, Default, Clone)]
pub struct EolConverter {
    last_was_cr: bool,
}

impl EolConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn convert<'a>(&mut self, chunk: &'a [u8]) -> Cow<'a, [u8]> {
        let carried_cr = self.last_was_cr;
        if let Some(&last) = chunk.last() {
            self.last_was_cr = last == b'\r';
        }

        let mut prev_cr = carried_cr;
        let has_lone_lf = chunk.iter().any(|&b| {
            let lone = b == b'\n' && !prev_cr;
            prev_cr = b == b'\r';
            lone
        });
        if !has_lone_lf {
            return Cow::Borrowed(chunk);
        }

        let mut out = Vec::with_capacity(chunk.len() + 8);
        let mut prev_cr = carried_cr;
        for &b in chunk {
            if b == b'\n' && !prev_cr {
                out.push(b'\r');
            }
            out.push(b);
            prev_cr = b == b'\r';
        }
        Cow::Owned(out)
    }
}
