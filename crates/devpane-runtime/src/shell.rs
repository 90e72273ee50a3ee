//! `jsh`, the builtin line shell of the in-memory runtime.
//!
//! Echoes keystrokes the way a terminal line discipline would, keeps a
//! single editable line, and runs a handful of filesystem commands against
//! the session's `MemoryFs`. Output uses bare `\n`; the terminal side is
//! responsible for end-of-line conversion.

use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::broadcast;

use devpane_types::ServerReady;

use crate::fs::{EntryType, Filesystem, MemoryFs};
use crate::process::ProcessIo;

pub(crate) const PROMPT: &str = "❯ ";

const HELP: &str = "\
builtins:
  ls [dir]             list a directory
  cat <file>           print a file
  echo [text] [> file] print text, or write it to a file
  touch <file>         create an empty file
  mkdir <dir>          create a directory
  rm <path>            remove a file or empty directory
  serve <port>         announce a server on localhost:<port>
  exit [code]          leave the shell
";

enum Outcome {
    Continue,
    Exit(i32),
}

/// One running `jsh` instance.
pub(crate) struct Jsh {
    fs: Arc<MemoryFs>,
    ready: broadcast::Sender<ServerReady>,
}

impl Jsh {
    pub(crate) fn new(fs: Arc<MemoryFs>, ready: broadcast::Sender<ServerReady>) -> Self {
        Self { fs, ready }
    }

    /// Drive the shell until `exit`, Ctrl-D on an empty line, or EOF on stdin.
    pub(crate) async fn run(self, mut io: ProcessIo) {
        match self.session(&mut io).await {
            Ok(code) => io.exit(code),
            // Caller went away; nobody is left to read an exit code.
            Err(e) => tracing::debug!("jsh stopped: {}", e),
        }
    }

    async fn session(&self, io: &mut ProcessIo) -> io::Result<i32> {
        io.stdout.write_all(PROMPT.as_bytes()).await?;

        let mut line: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        // CRLF from the terminal is one line ending
        let mut after_cr = false;
        loop {
            let n = io.stdin.read(&mut buf).await?;
            if n == 0 {
                return Ok(0);
            }

            for &byte in &buf[..n] {
                let swallow = byte == b'\n' && after_cr;
                after_cr = byte == b'\r';
                match byte {
                    b'\n' if swallow => {}
                    b'\r' | b'\n' => {
                        io.stdout.write_all(b"\n").await?;
                        let text = String::from_utf8_lossy(&line).into_owned();
                        line.clear();

                        let mut out = String::new();
                        let outcome = self.execute(&text, &mut out).await;
                        io.stdout.write_all(out.as_bytes()).await?;
                        if let Outcome::Exit(code) = outcome {
                            io.stdout.shutdown().await?;
                            return Ok(code);
                        }
                        io.stdout.write_all(PROMPT.as_bytes()).await?;
                    }
                    // Backspace / DEL
                    0x7f | 0x08 => {
                        if line.pop().is_some() {
                            io.stdout.write_all(b"\x08 \x08").await?;
                        }
                    }
                    // Ctrl-C
                    0x03 => {
                        line.clear();
                        io.stdout.write_all(b"^C\n").await?;
                        io.stdout.write_all(PROMPT.as_bytes()).await?;
                    }
                    // Ctrl-D
                    0x04 if line.is_empty() => {
                        io.stdout.write_all(b"\n").await?;
                        io.stdout.shutdown().await?;
                        return Ok(0);
                    }
                    // Ctrl-D mid-line does nothing
                    0x04 => {}
                    _ => {
                        line.push(byte);
                        io.stdout.write_all(&[byte]).await?;
                    }
                }
            }
            io.stdout.flush().await?;
        }
    }

    async fn execute(&self, line: &str, out: &mut String) -> Outcome {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = words.split_first() else {
            return Outcome::Continue;
        };

        let result = match cmd {
            "ls" => self.ls(args.first().copied().unwrap_or("."), out).await,
            "cat" => self.cat(args, out).await,
            "echo" => self.echo(args, out).await,
            "touch" => self.touch(args).await,
            "mkdir" => self.mkdir(args).await,
            "rm" => self.rm(args).await,
            "serve" => self.serve(args, out),
            "help" => {
                out.push_str(HELP);
                Ok(())
            }
            "exit" => {
                let code = args.first().and_then(|c| c.parse().ok()).unwrap_or(0);
                return Outcome::Exit(code);
            }
            other => {
                out.push_str(&format!("jsh: command not found: {other}\n"));
                Ok(())
            }
        };

        if let Err(e) = result {
            out.push_str(&format!("{cmd}: {e}\n"));
        }
        Outcome::Continue
    }

    async fn ls(&self, dir: &str, out: &mut String) -> io::Result<()> {
        if self.fs.stat(Path::new(dir)).await?.is_file() {
            out.push_str(dir);
            out.push('\n');
            return Ok(());
        }
        for entry in self.fs.list(Path::new(dir)).await? {
            out.push_str(&entry.name);
            if entry.entry_type == EntryType::Directory {
                out.push('/');
            }
            out.push('\n');
        }
        Ok(())
    }

    async fn cat(&self, args: &[&str], out: &mut String) -> io::Result<()> {
        for path in args {
            let bytes = self.fs.read(Path::new(path)).await?;
            out.push_str(&String::from_utf8_lossy(&bytes));
        }
        Ok(())
    }

    async fn echo(&self, args: &[&str], out: &mut String) -> io::Result<()> {
        match args.iter().position(|a| *a == ">") {
            Some(idx) => {
                let target = args.get(idx + 1).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "missing redirect target")
                })?;
                let text = format!("{}\n", args[..idx].join(" "));
                self.fs.write(Path::new(target), text.as_bytes()).await
            }
            None => {
                out.push_str(&args.join(" "));
                out.push('\n');
                Ok(())
            }
        }
    }

    async fn touch(&self, args: &[&str]) -> io::Result<()> {
        for path in args {
            if !self.fs.exists(Path::new(path)).await {
                self.fs.write(Path::new(path), b"").await?;
            }
        }
        Ok(())
    }

    async fn mkdir(&self, args: &[&str]) -> io::Result<()> {
        require_operand(args)?;
        for path in args {
            self.fs.mkdir(Path::new(path)).await?;
        }
        Ok(())
    }

    async fn rm(&self, args: &[&str]) -> io::Result<()> {
        require_operand(args)?;
        for path in args {
            self.fs.remove(Path::new(path)).await?;
        }
        Ok(())
    }

    fn serve(&self, args: &[&str], out: &mut String) -> io::Result<()> {
        let port: u16 = args
            .first()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "usage: serve <port>"))?;
        let ready = ServerReady::localhost(port);
        out.push_str(&format!("listening on {}\n", ready.url));
        // No subscribers is fine: nobody is previewing yet.
        let _ = self.ready.send(ready);
        Ok(())
    }
}

fn require_operand(args: &[&str]) -> io::Result<()> {
    if args.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "missing operand"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{process_pipe, Process};
    use tokio::time::{timeout, Duration};

    struct Harness {
        process: Process,
        fs: Arc<MemoryFs>,
        ready: broadcast::Receiver<ServerReady>,
    }

    fn start() -> Harness {
        let fs = Arc::new(MemoryFs::new());
        let (tx, ready) = broadcast::channel(8);
        let (process, io) = process_pipe(4096);
        tokio::spawn(Jsh::new(fs.clone(), tx).run(io));
        Harness { process, fs, ready }
    }

    /// Read output until `needle` shows up.
    async fn read_until(process: &mut Process, needle: &str) -> String {
        let mut seen = Vec::new();
        let mut buf = [0u8; 256];
        timeout(Duration::from_secs(2), async {
            loop {
                let n = process.output.read(&mut buf).await.unwrap();
                assert!(n > 0, "EOF before {needle:?}");
                seen.extend_from_slice(&buf[..n]);
                if String::from_utf8_lossy(&seen).contains(needle) {
                    break;
                }
            }
        })
        .await
        .expect("shell output timed out");
        String::from_utf8_lossy(&seen).into_owned()
    }

    #[tokio::test]
    async fn test_prompt_and_echo_of_keystrokes() {
        let mut h = start();
        read_until(&mut h.process, PROMPT).await;

        h.process.input.write_all(b"echo hi\r").await.unwrap();
        let out = read_until(&mut h.process, "hi\n").await;
        assert!(out.starts_with("echo hi\n"));
    }

    #[tokio::test]
    async fn test_echo_redirect_writes_file() {
        let mut h = start();
        h.process.input.write_all(b"echo hello > a.txt\r").await.unwrap();
        read_until(&mut h.process, &format!("\n{PROMPT}")).await;

        assert_eq!(
            h.fs.read_to_string(Path::new("a.txt")).await.unwrap(),
            "hello\n"
        );
    }

    #[tokio::test]
    async fn test_backspace_edits_line() {
        let mut h = start();
        h.process.input.write_all(b"lx\x7fs\r").await.unwrap();
        let out = read_until(&mut h.process, &format!("\n{PROMPT}")).await;
        assert!(!out.contains("command not found"));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let mut h = start();
        h.process.input.write_all(b"node index.js\r").await.unwrap();
        read_until(&mut h.process, "jsh: command not found: node").await;
    }

    #[tokio::test]
    async fn test_serve_emits_readiness() {
        let mut h = start();
        h.process.input.write_all(b"serve 3000\r").await.unwrap();
        read_until(&mut h.process, "listening on http://localhost:3000").await;

        let ev = h.ready.recv().await.unwrap();
        assert_eq!(ev, ServerReady::localhost(3000));
    }

    #[tokio::test]
    async fn test_exit_reports_code() {
        let mut h = start();
        h.process.input.write_all(b"exit 7\r").await.unwrap();

        let mut rest = Vec::new();
        h.process.output.read_to_end(&mut rest).await.unwrap();
        assert_eq!(h.process.exit.wait().await, Some(7));
    }

    async fn run_to_exit(mut h: Harness, keys: &[u8]) -> String {
        h.process.input.write_all(keys).await.unwrap();
        let mut rest = Vec::new();
        timeout(Duration::from_secs(2), h.process.output.read_to_end(&mut rest))
            .await
            .expect("shell never exited")
            .unwrap();
        String::from_utf8_lossy(&rest).into_owned()
    }

    #[tokio::test]
    async fn test_crlf_is_one_line_ending() {
        let out = run_to_exit(start(), b"echo a\r\necho b\r\nexit\r\n").await;
        // Initial prompt plus one per command before exit
        assert_eq!(out.matches(PROMPT).count(), 3);
        assert!(out.contains("echo a\na\n"));
    }

    #[tokio::test]
    async fn test_ctrl_d_mid_line_is_ignored() {
        let out = run_to_exit(start(), b"ech\x04o x\rexit\r").await;
        assert!(!out.contains('\x04'));
        assert!(out.contains("echo x\nx\n"));
    }

    #[tokio::test]
    async fn test_ls_of_a_file_names_it() {
        let out = run_to_exit(start(), b"touch f.txt\rls f.txt\rexit\r").await;
        assert!(out.contains("ls f.txt\nf.txt\n"));
    }
}
