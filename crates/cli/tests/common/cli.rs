//! Helpers for running the `folio` binary against an isolated environment
//!
//! Each `FolioEnv` owns a temp directory holding its own config file and
//! data directory, so tests never touch the user's real configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Scratch config + data directory
pub struct FolioEnv {
    temp_dir: TempDir,
}

impl FolioEnv {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        std::fs::create_dir_all(temp_dir.path().join("folders"))?;
        Ok(Self { temp_dir })
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("folio.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    /// Create a folder under the scratch area containing `files`
    pub fn folder(&self, name: &str, files: &[&str]) -> Result<PathBuf> {
        let dir = self.temp_dir.path().join("folders").join(name);
        std::fs::create_dir_all(&dir)?;
        for file in files {
            std::fs::write(dir.join(file), file.as_bytes())?;
        }
        Ok(dir.canonicalize()?)
    }

    pub fn command(&self) -> FolioCommand {
        FolioCommand {
            config_path: self.config_path(),
            data_dir: self.data_dir(),
            args: Vec::new(),
        }
    }
}

/// CLI command builder with timing
pub struct FolioCommand {
    config_path: PathBuf,
    data_dir: PathBuf,
    args: Vec<String>,
}

impl FolioCommand {
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();
        let output = Command::new(env!("CARGO_BIN_EXE_folio"))
            .args(&self.args)
            .env("FOLIO_CONFIG", &self.config_path)
            .env("FOLIO_DATA_DIR", &self.data_dir)
            .env_remove("RUST_LOG")
            .output()
            .context("Failed to execute folio")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check stdout, ignoring color codes
    pub fn contains_stdout(&self, text: &str) -> bool {
        strip_ansi(&self.stdout).contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        strip_ansi(&self.stderr).contains(text)
    }
}

/// Remove SGR escape sequences (`ESC [ ... m`)
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// folio!(env, "favorite", "list").assert_success()?;
/// ```
#[macro_export]
macro_rules! folio {
    ($env:expr, $($arg:expr),*) => {{
        let mut cmd = $env.command();
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
