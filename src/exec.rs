//! External command execution capability.
//!
//! The pipeline never spawns processes directly; it goes through
//! [`CommandRunner`] so state transitions and error mapping are testable with
//! deterministic fakes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Captured result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Last `limit` characters of combined output, for error messages.
    pub fn tail(&self, limit: usize) -> String {
        let combined = if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        };
        let combined = combined.trim();
        match combined.char_indices().nth_back(limit.saturating_sub(1)) {
            Some((idx, _)) if idx > 0 => format!("...{}", &combined[idx..]),
            _ => combined.to_string(),
        }
    }
}

/// Runs a named command with a working directory, returning exit status plus
/// captured output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput>;
}

/// Production runner backed by `tokio::process`.
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        debug!(program, ?args, cwd = %cwd.display(), "running command");

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to spawn `{}`", program))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
