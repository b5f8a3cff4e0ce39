//! Runner module - Process execution abstraction layer
//!
//! This module provides the narrow process capability the judge is built on:
//! - `ProcessRunner`: spawns a command
//! - `ChildProcess`: feeds stdin, waits with a deadline, terminates
//!
//! `LocalRunner` is the real implementation on top of `tokio::process`.
//! Tests swap in a scripted runner so timeouts and crashes are deterministic.
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Measure elapsed time (the executor does)
//! - Know about languages or compilation

pub mod local;

#[cfg(test)]
pub mod fake;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory (inherited when `None`)
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        match cmd.split_first() {
            Some((program, args)) => Self::new(program.as_str()).with_args(args.iter().cloned()),
            None => Self::new(String::new()),
        }
    }

    /// Convert to a vector of strings (program + args)
    pub fn to_vec(&self) -> Vec<String> {
        let mut v = vec![self.program.clone()];
        v.extend(self.args.clone());
        v
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_vec().join(" "))
    }
}

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited with the given code
    Code(i32),
    /// Killed by a signal (unix)
    Signal(i32),
}

impl ExitKind {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitKind::Code(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitKind::Code(code) => Some(*code),
            ExitKind::Signal(_) => None,
        }
    }
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitKind::Code(code) => write!(f, "Exit {}", code),
            ExitKind::Signal(sig) => write!(f, "Signal {}", sig),
        }
    }
}

/// Everything a finished child left behind
#[derive(Debug, Clone)]
pub struct ChildExit {
    pub exit: ExitKind,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runner trait for spawning programs
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Spawn a command with piped stdin/stdout/stderr
    async fn spawn(&self, cmd: &CommandSpec) -> Result<Box<dyn ChildProcess>>;
}

/// A spawned program
#[async_trait]
pub trait ChildProcess: Send {
    /// Hand the whole stdin content to the child, then close its stdin
    async fn write_stdin(&mut self, input: Vec<u8>) -> Result<()>;

    /// Wait until the child exits and its output is drained.
    ///
    /// Returns `None` when `deadline` elapses first; the child is then still
    /// alive and must be terminated by the caller.
    async fn wait_with_deadline(&mut self, deadline: Duration) -> Result<Option<ChildExit>>;

    /// Forcefully kill the child and everything it spawned, and reap it
    async fn terminate(&mut self) -> Result<()>;
}

// Re-exports
pub use local::LocalRunner;
