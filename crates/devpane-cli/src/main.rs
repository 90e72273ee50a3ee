//! devpane CLI entry point.
//!
//! Usage:
//!   devpane                    # Workspace from the default config file
//!   devpane --config <file>    # Workspace from an explicit config file
//!
//! Boots an in-memory runtime, mounts the configured files and bridges the
//! `jsh` shell to stdin/stdout. File list, selection and preview changes are
//! logged to stderr (set `RUST_LOG=info` to see them).

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use devpane_core::{LifecycleController, ShellBridge, TerminalSink, Workspace, WorkspaceConfig};
use devpane_runtime::MemoryRuntime;

/// Ctrl-D, sent when stdin closes so the shell can exit cleanly.
const EOT: u8 = 0x04;

fn main() -> ExitCode {
    // Stdout belongs to the terminal, so logs go to stderr (respects RUST_LOG)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    let config_path = match args.get(1).map(|s| s.as_str()) {
        None => None,

        Some("--help" | "-h") => {
            print_help();
            return Ok(ExitCode::SUCCESS);
        }

        Some("--version" | "-V") => {
            println!("devpane {}", env!("CARGO_PKG_VERSION"));
            return Ok(ExitCode::SUCCESS);
        }

        Some(arg) if arg.starts_with("--config=") => Some(PathBuf::from(&arg["--config=".len()..])),

        Some("--config") => {
            let path = args.get(2).context("--config requires a file path")?;
            Some(PathBuf::from(path))
        }

        Some(other) => bail!("unknown argument: {other} (see --help)"),
    };

    let config = match &config_path {
        Some(path) => WorkspaceConfig::load_from(path)?,
        None => WorkspaceConfig::load()?,
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(run_workspace(config))
}

async fn run_workspace(config: WorkspaceConfig) -> Result<ExitCode> {
    let controller = LifecycleController::new(Arc::new(MemoryRuntime::new()), config);
    let workspace = controller
        .start(Arc::new(StdoutSink))
        .await
        .context("Failed to start workspace")?;

    let config = controller.config();
    tracing::info!(
        workspace = %config.name,
        rows = config.terminal.rows,
        convert_eol = config.terminal.convert_eol,
        "workspace started"
    );

    let Some(shell) = workspace.shell().cloned() else {
        workspace.shutdown().await;
        bail!("shell did not start");
    };

    watch_workspace(&workspace);
    tokio::spawn(relay_stdin(shell.clone()));

    let code = shell.exited().await.unwrap_or(-1);
    workspace.shutdown().await;

    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

/// Log every published change the presentation layer would render.
fn watch_workspace(workspace: &Workspace) {
    let mut files = workspace.files().files();
    tokio::spawn(async move {
        while files.changed().await.is_ok() {
            let listing = files.borrow_and_update().join(", ");
            tracing::info!(files = %listing, "file list changed");
        }
    });

    let mut selection = workspace.files().selection();
    tokio::spawn(async move {
        while selection.changed().await.is_ok() {
            if let Some(path) = selection.borrow_and_update().as_deref() {
                tracing::info!(%path, "selected file");
            }
        }
    });

    let mut target = workspace.preview().target();
    tokio::spawn(async move {
        while target.changed().await.is_ok() {
            if let Some(url) = target.borrow_and_update().as_deref() {
                tracing::info!(%url, "preview target");
            }
        }
    });
}

/// Forward stdin to the shell until either side closes.
async fn relay_stdin(shell: ShellBridge) {
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 1024];
    loop {
        let n = match stdin.read(&mut buf).await {
            Ok(0) => {
                let _ = shell.send_keys(&[EOT]);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if shell.send_keys(&buf[..n]).is_err() {
            break;
        }
    }
}

/// Terminal sink that writes straight to stdout.
struct StdoutSink;

impl TerminalSink for StdoutSink {
    fn write(&self, chunk: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(chunk).and_then(|()| stdout.flush()) {
            tracing::debug!(error = %e, "stdout write failed");
        }
    }
}

fn print_help() {
    println!(
        r#"devpane - headless dev environment over an in-memory runtime

USAGE:
    devpane [OPTIONS]

OPTIONS:
    --config <file>    Load workspace config from <file>
                       (default: {})
    -h, --help         Show this help
    -V, --version      Show version

SHELL:
    Type `help` inside the shell for its commands. `serve <port>` announces
    a preview URL; `exit [code]` ends the session.

ENVIRONMENT:
    RUST_LOG           Log filter, e.g. info or devpane_core=debug"#,
        WorkspaceConfig::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "<none>".to_string())
    );
}
