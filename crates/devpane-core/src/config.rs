//! Workspace configuration.
//!
//! Loaded from `devpane.toml` in the platform config directory
//! (`~/.config/devpane/devpane.toml` on Linux), or from an explicit path.
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! name = "hello-server"
//! shell = "jsh"
//! poll_interval_ms = 800
//! write_debounce_ms = 800
//!
//! [terminal]
//! convert_eol = true
//! rows = 15
//!
//! [files."index.js".file]
//! contents = "console.log('hi')"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use devpane_types::FileTree;

/// Configuration handed to the lifecycle controller at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace name (for logs).
    #[serde(default = "default_name")]
    pub name: String,

    /// Program spawned as the interactive shell.
    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default)]
    pub shell_args: Vec<String>,

    /// Directory whose listing drives the file list.
    #[serde(default = "default_root")]
    pub root: String,

    /// Period of the directory listing poll, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,

    /// Idle time after the last edit to a path before it is written.
    #[serde(default = "default_interval_ms")]
    pub write_debounce_ms: u64,

    #[serde(default)]
    pub terminal: TerminalConfig,

    /// Initial tree mounted into the runtime before anything else runs.
    #[serde(default)]
    pub files: FileTree,
}

/// Terminal presentation options that affect the byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Write lone `\n` from the shell as `\r\n`.
    #[serde(default = "default_true")]
    pub convert_eol: bool,

    /// Visible rows, for front ends that size their terminal.
    #[serde(default = "default_rows")]
    pub rows: u16,
}

fn default_name() -> String {
    "devpane".to_string()
}

fn default_shell() -> String {
    "jsh".to_string()
}

fn default_root() -> String {
    ".".to_string()
}

fn default_interval_ms() -> u64 {
    800
}

fn default_true() -> bool {
    true
}

fn default_rows() -> u16 {
    15
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            convert_eol: default_true(),
            rows: default_rows(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            shell: default_shell(),
            shell_args: Vec::new(),
            root: default_root(),
            poll_interval_ms: default_interval_ms(),
            write_debounce_ms: default_interval_ms(),
            terminal: TerminalConfig::default(),
            files: FileTree::new(),
        }
    }
}

impl WorkspaceConfig {
    /// Default configuration with the given initial files.
    pub fn with_files(files: FileTree) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        anyhow::ensure!(config.poll_interval_ms > 0, "poll_interval_ms must be positive");
        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "devpane")
            .context("Could not determine config directory")?;

        Ok(dirs.config_dir().join("devpane.toml"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn write_debounce(&self) -> Duration {
        Duration::from_millis(self.write_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devpane_types::FileNode;

    #[test]
    fn test_default_config() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.shell, "jsh");
        assert_eq!(config.root, ".");
        assert_eq!(config.poll_interval(), Duration::from_millis(800));
        assert_eq!(config.write_debounce(), Duration::from_millis(800));
        assert!(config.terminal.convert_eol);
        assert_eq!(config.terminal.rows, 15);
        assert!(config.files.is_empty());
    }

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(WorkspaceConfig::parse("").unwrap(), WorkspaceConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
name = "hello-server"
shell = "sh"
poll_interval_ms = 250
write_debounce_ms = 1000

[terminal]
convert_eol = false

[files."index.js".file]
contents = "console.log('hi')"

[files.lib.directory."util.js".file]
contents = ""
"#;
        let config = WorkspaceConfig::parse(toml).unwrap();
        assert_eq!(config.name, "hello-server");
        assert_eq!(config.shell, "sh");
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.write_debounce(), Duration::from_secs(1));
        assert!(!config.terminal.convert_eol);
        assert_eq!(config.terminal.rows, 15);
        assert_eq!(
            config.files.get("index.js"),
            Some(&FileNode::File {
                contents: "console.log('hi')".into()
            })
        );
        assert!(matches!(config.files.get("lib"), Some(FileNode::Directory(_))));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        assert!(WorkspaceConfig::parse("poll_interval_ms = 0").is_err());
    }
}
