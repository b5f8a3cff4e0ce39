use anyhow::{Context, Result};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{debug, warn};

use crate::runner::{CommandSpec, ProcessRunner};

pub use crate::runner::ExitKind;

/// Terminal state of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Exited with code 0
    Completed,
    /// Exited with a non-zero code or was killed by a signal
    Failed(ExitKind),
    /// Still running when the wall-clock limit elapsed
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Raw stdout (empty when timed out)
    pub stdout: Vec<u8>,
    /// Stderr, only kept for `Failed`
    pub stderr: Option<String>,
    /// Real elapsed time, or exactly the limit when timed out
    pub duration: Duration,
}

impl ExecutionResult {
    /// Stdout as text (may have UTF-8 conversion losses)
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }
}

/// Runs a resolved command once against one input file
pub struct Executor {
    runner: Arc<dyn ProcessRunner>,
}

impl Executor {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Execute `command` with `input_file` as stdin under a wall-clock `timeout`.
    ///
    /// Errors are reserved for problems outside the program itself (unreadable
    /// input, spawn failure). A timed out child is dead when this returns.
    pub async fn execute(
        &self,
        command: &CommandSpec,
        input_file: &Path,
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let input = fs::read(input_file)
            .await
            .with_context(|| format!("Failed to read input file {}", input_file.display()))?;

        let start = Instant::now();
        let mut child = self.runner.spawn(command).await?;

        let waited = match child.write_stdin(input).await {
            Ok(()) => child.wait_with_deadline(timeout).await,
            Err(e) => Err(e),
        };
        let exit = match waited {
            Ok(exit) => exit,
            Err(e) => {
                // The child may still be running with its whole group
                if let Err(kill_err) = child.terminate().await {
                    warn!("Failed to terminate `{}`: {:#}", command, kill_err);
                }
                return Err(e.context(format!("Failed to run `{}`", command)));
            }
        };

        let Some(exit) = exit else {
            debug!(
                "Killing `{}` after {:.3}s on {}",
                command,
                timeout.as_secs_f64(),
                input_file.display()
            );
            child
                .terminate()
                .await
                .with_context(|| format!("Failed to terminate `{}`", command))?;

            return Ok(ExecutionResult {
                status: ExecutionStatus::TimedOut,
                stdout: Vec::new(),
                stderr: None,
                duration: timeout,
            });
        };

        let duration = start.elapsed();

        if exit.exit.is_success() {
            Ok(ExecutionResult {
                status: ExecutionStatus::Completed,
                stdout: exit.stdout,
                stderr: None,
                duration,
            })
        } else {
            warn!(
                "`{}` on {} ended abnormally: {}",
                command,
                input_file.display(),
                exit.exit
            );
            Ok(ExecutionResult {
                status: ExecutionStatus::Failed(exit.exit),
                stdout: exit.stdout,
                stderr: Some(String::from_utf8_lossy(&exit.stderr).into_owned()),
                duration,
            })
        }
    }
}
