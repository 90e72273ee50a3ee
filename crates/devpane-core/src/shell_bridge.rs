//! Pipes between one spawned shell and the terminal.
//!
//! ```text
//!   terminal keystrokes ──send_keys──▶ mpsc ──▶ input relay ──▶ process.input
//!   TerminalSink ◀── EolConverter ◀── output relay ◀── process.output
//!   exit watcher ◀── process.exit
//! ```
//!
//! Each direction is its own task, so neither blocks the other. Output chunks
//! reach the sink in the order the process produced them.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use devpane_runtime::{Process, RuntimeResult, SessionRef};

use crate::config::WorkspaceConfig;
use crate::error::BridgeError;
use crate::terminal::{EolConverter, TerminalSink};

const READ_CHUNK: usize = 4096;

/// Handle to a running shell's input and exit status.
#[derive(Debug, Clone)]
pub struct ShellBridge {
    keys: mpsc::UnboundedSender<Vec<u8>>,
    exit: watch::Receiver<Option<i32>>,
}

impl ShellBridge {
    /// Spawn the configured shell in `session` and attach it to `sink`.
    pub async fn spawn(
        session: &SessionRef,
        config: &WorkspaceConfig,
        sink: Arc<dyn TerminalSink>,
        cancel: CancellationToken,
    ) -> RuntimeResult<Self> {
        let process = session.spawn(&config.shell, &config.shell_args).await?;
        tracing::info!(shell = %config.shell, "shell spawned");
        Ok(Self::attach(process, sink, config.terminal.convert_eol, cancel))
    }

    /// Wire an already spawned process to `sink`.
    pub fn attach(
        process: Process,
        sink: Arc<dyn TerminalSink>,
        convert_eol: bool,
        cancel: CancellationToken,
    ) -> Self {
        let Process {
            mut output,
            mut input,
            exit,
        } = process;

        let (keys, mut key_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (exit_tx, exit_rx) = watch::channel(None);

        let out_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut eol = EolConverter::new();
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                let n = tokio::select! {
                    biased;
                    _ = out_cancel.cancelled() => break,
                    read = output.read(&mut buf) => match read {
                        Ok(0) => break,
                        Ok(n) => n,
                        Err(e) => {
                            tracing::warn!(error = %e, "shell output failed");
                            break;
                        }
                    },
                };
                let chunk = &buf[..n];
                if convert_eol {
                    sink.write(&eol.convert(chunk));
                } else {
                    sink.write(chunk);
                }
            }
            tracing::debug!("shell output relay stopped");
        });

        let in_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let keys = tokio::select! {
                    biased;
                    _ = in_cancel.cancelled() => break,
                    keys = key_rx.recv() => match keys {
                        Some(keys) => keys,
                        None => break,
                    },
                };
                let written = match input.write_all(&keys).await {
                    Ok(()) => input.flush().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    tracing::debug!(error = %e, "shell input closed");
                    break;
                }
            }
            // Stop accepting keys once the pipe is gone
            key_rx.close();
        });

        tokio::spawn(async move {
            let code = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                code = exit.wait() => code,
            };
            let code = code.unwrap_or(-1);
            tracing::info!(code, "shell exited");
            exit_tx.send_replace(Some(code));
        });

        Self {
            keys,
            exit: exit_rx,
        }
    }

    /// Forward keystrokes to the shell unchanged.
    pub fn send_keys(&self, keys: &[u8]) -> Result<(), BridgeError> {
        if self.exit.borrow().is_some() {
            return Err(BridgeError::Closed);
        }
        self.keys
            .send(keys.to_vec())
            .map_err(|_| BridgeError::Closed)
    }

    /// The exit code, once the shell has exited.
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit.borrow()
    }

    /// Wait for the shell to exit.
    ///
    /// Returns `None` if the workspace was torn down first.
    pub async fn exited(&self) -> Option<i32> {
        let mut exit = self.exit.clone();
        let code = match exit.wait_for(Option::is_some).await {
            Ok(code) => *code,
            Err(_) => None,
        };
        code
    }
}
