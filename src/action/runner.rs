// src/action/runner.rs

//! Pluggable action runner.
//!
//! The dispatch loop hands rendered commands to an [`ActionRunner`] instead of
//! spawning processes itself, so tests can record commands without touching
//! the OS.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{Result, SentinelError};

/// Captured result of a finished action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ActionOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait abstracting how a rendered action command is executed.
pub trait ActionRunner: Send + Sync {
    /// Run `command` on behalf of notification `id` and wait for it.
    ///
    /// Spawn failures and timeouts are errors; a non-zero exit is reported
    /// through [`ActionOutput::exit_code`].
    fn run<'a>(
        &'a self,
        id: i64,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ActionOutput>> + Send + 'a>>;
}

/// Runs actions through the platform shell (`sh -c`, or `cmd /C` on Windows).
#[derive(Debug, Clone, Default)]
pub struct ShellActionRunner {
    timeout: Option<Duration>,
}

impl ShellActionRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn build_command(command: &str) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run_inner(&self, id: i64, command: &str) -> Result<ActionOutput> {
        info!(id, cmd = %command, "running action");

        let child = Self::build_command(command)
            .spawn()
            .map_err(|err| SentinelError::ActionFailed {
                id,
                reason: format!("spawning action: {err}"),
            })?;

        // Dropping the `wait_with_output` future on timeout drops the child,
        // which kills it.
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    return Err(SentinelError::ActionFailed {
                        id,
                        reason: format!("timed out after {} ms", limit.as_millis()),
                    });
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|err| SentinelError::ActionFailed {
            id,
            reason: format!("waiting for action: {err}"),
        })?;

        let result = ActionOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(
            id,
            exit_code = result.exit_code,
            stdout = %result.stdout.trim_end(),
            stderr = %result.stderr.trim_end(),
            "action exited"
        );
        Ok(result)
    }
}

impl ActionRunner for ShellActionRunner {
    fn run<'a>(
        &'a self,
        id: i64,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ActionOutput>> + Send + 'a>> {
        Box::pin(self.run_inner(id, command))
    }
}
