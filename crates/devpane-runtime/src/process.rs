//! Process handles returned by `RuntimeSession::spawn`.
//!
//! ```text
//!   caller side (Process)                 process side (ProcessIo)
//!   ─────────────────────                 ────────────────────────
//!   input  (AsyncWrite) ──▶ duplex ──▶ stdin  (AsyncRead)
//!   output (AsyncRead)  ◀── duplex ◀── stdout (AsyncWrite)
//!   exit   (ExitWaiter) ◀── oneshot ── exit   (ExitSender)
//! ```
//!
//! Both directions share one `tokio::io::duplex` pair, so backpressure is
//! whatever the duplex buffer provides. Dropping the process side yields EOF
//! on `output`.

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::oneshot;

/// Default buffer size for each direction of a process pipe.
pub const PROCESS_PIPE_SIZE: usize = 64 * 1024;

/// A spawned process as seen by its caller.
pub struct Process {
    /// Bytes the process writes, in production order.
    pub output: Box<dyn AsyncRead + Send + Unpin>,
    /// Bytes fed to the process's input.
    pub input: Box<dyn AsyncWrite + Send + Unpin>,
    /// Resolves with the exit code.
    pub exit: ExitWaiter,
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process").finish_non_exhaustive()
    }
}

/// Waits for a process to report its exit code.
#[derive(Debug)]
pub struct ExitWaiter {
    rx: oneshot::Receiver<i32>,
}

impl ExitWaiter {
    /// Wrap a oneshot receiver fed by the process implementation.
    pub fn new(rx: oneshot::Receiver<i32>) -> Self {
        Self { rx }
    }

    /// Wait for the exit code.
    ///
    /// Returns `None` if the process went away without reporting one.
    pub async fn wait(self) -> Option<i32> {
        self.rx.await.ok()
    }
}

/// The process side of a [`process_pipe`].
#[derive(Debug)]
pub struct ProcessIo {
    pub stdin: ReadHalf<DuplexStream>,
    pub stdout: WriteHalf<DuplexStream>,
    exit: oneshot::Sender<i32>,
}

impl ProcessIo {
    /// Report the exit code and close both streams.
    pub fn exit(self, code: i32) {
        // Receiver dropped means nobody is waiting
        let _ = self.exit.send(code);
    }
}

/// Create a connected `(Process, ProcessIo)` pair.
///
/// Runtime implementations hand the `Process` to the caller and drive the
/// `ProcessIo` from whatever task implements the program.
pub fn process_pipe(buffer: usize) -> (Process, ProcessIo) {
    let (caller, program) = tokio::io::duplex(buffer);
    let (output, input) = tokio::io::split(caller);
    let (stdin, stdout) = tokio::io::split(program);
    let (exit_tx, exit_rx) = oneshot::channel();

    (
        Process {
            output: Box::new(output),
            input: Box::new(input),
            exit: ExitWaiter::new(exit_rx),
        },
        ProcessIo {
            stdin,
            stdout,
            exit: exit_tx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_pipe_both_directions() {
        let (mut process, mut io) = process_pipe(1024);

        process.input.write_all(b"ls\r").await.unwrap();
        let mut buf = [0u8; 3];
        io.stdin.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ls\r");

        io.stdout.write_all(b"main.js\n").await.unwrap();
        let mut buf = [0u8; 8];
        process.output.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"main.js\n");
    }

    #[tokio::test]
    async fn test_exit_closes_output() {
        let (mut process, io) = process_pipe(1024);
        io.exit(3);

        let mut rest = Vec::new();
        process.output.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        assert_eq!(process.exit.wait().await, Some(3));
    }

    #[tokio::test]
    async fn test_dropped_program_reports_no_exit_code() {
        let (process, io) = process_pipe(1024);
        drop(io);
        assert_eq!(process.exit.wait().await, None);
    }
}
