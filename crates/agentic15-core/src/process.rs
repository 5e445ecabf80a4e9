//! Subprocess invocation for the external CLIs (`git`, `gh`, `az`).
//!
//! Every shell-out in the crate goes through [`CommandRunner`] so callers can
//! swap in a scripted runner under test. Commands block until the child
//! exits; there are no timeouts.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Stdout with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }

    /// Short diagnostic for log lines: stderr if present, else stdout.
    pub fn diagnostic(&self) -> String {
        let msg = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        msg.chars().take(500).collect()
    }
}

pub trait CommandRunner {
    /// Run `program` with `args` in `cwd`. An `Err` means the process could
    /// not be spawned at all (binary missing); a non-zero exit is reported
    /// through [`CommandOutput::success`].
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> io::Result<CommandOutput>;

    /// Whether `program` resolves on `PATH`.
    fn available(&self, program: &str) -> bool;
}

/// Runs real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> io::Result<CommandOutput> {
        tracing::debug!(program, ?args, "spawning");
        let bin = which::which(program)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{program}: {e}")))?;
        let output = Command::new(bin)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
