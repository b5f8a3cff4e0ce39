//! Scripted runner for tests
//!
//! Decides what a "process" does from its command and stdin without spawning
//! anything, and records every call so tests can assert on the lifecycle.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ChildExit, ChildProcess, CommandSpec, ExitKind, ProcessRunner};

/// What a scripted process does
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Exit after `after` with the given status and output
    Exit {
        exit: ExitKind,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        after: Duration,
    },
    /// Never exit on its own
    Hang,
    /// Fail to spawn
    SpawnError(String),
    /// Spawn fine, then fail while waiting
    WaitError(String),
}

impl Behavior {
    pub fn prints(stdout: &str) -> Self {
        Behavior::Exit {
            exit: ExitKind::Code(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            after: Duration::ZERO,
        }
    }

    pub fn exits(code: i32, stdout: &str, stderr: &str) -> Self {
        Behavior::Exit {
            exit: ExitKind::Code(code),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            after: Duration::ZERO,
        }
    }

    pub fn sleeps(after: Duration, stdout: &str) -> Self {
        Behavior::Exit {
            exit: ExitKind::Code(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            after,
        }
    }
}

/// Lifecycle event recorded by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Spawned(CommandSpec),
    Stdin(Vec<u8>),
    Exited,
    DeadlineHit,
    Terminated,
}

type Script = dyn Fn(&CommandSpec, &[u8]) -> Behavior + Send + Sync;

#[derive(Clone)]
pub struct FakeRunner {
    script: Arc<Script>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl FakeRunner {
    /// Behavior picked per command and stdin
    pub fn new(script: impl Fn(&CommandSpec, &[u8]) -> Behavior + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Same behavior for every process
    pub fn always(behavior: Behavior) -> Self {
        Self::new(move |_, _| behavior.clone())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn spawned(&self) -> Vec<CommandSpec> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Spawned(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn spawn(&self, cmd: &CommandSpec) -> Result<Box<dyn ChildProcess>> {
        // Spawn failures are decided before stdin exists
        if let Behavior::SpawnError(msg) = (self.script)(cmd, &[]) {
            bail!("Failed to spawn `{}`: {}", cmd, msg);
        }

        self.events
            .lock()
            .unwrap()
            .push(Event::Spawned(cmd.clone()));

        Ok(Box::new(FakeChild {
            cmd: cmd.clone(),
            script: self.script.clone(),
            events: self.events.clone(),
            stdin: Vec::new(),
        }))
    }
}

struct FakeChild {
    cmd: CommandSpec,
    script: Arc<Script>,
    events: Arc<Mutex<Vec<Event>>>,
    stdin: Vec<u8>,
}

impl FakeChild {
    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl ChildProcess for FakeChild {
    async fn write_stdin(&mut self, input: Vec<u8>) -> Result<()> {
        self.record(Event::Stdin(input.clone()));
        self.stdin = input;
        Ok(())
    }

    async fn wait_with_deadline(&mut self, deadline: Duration) -> Result<Option<ChildExit>> {
        match (self.script)(&self.cmd, &self.stdin) {
            Behavior::Exit {
                exit,
                stdout,
                stderr,
                after,
            } if after <= deadline => {
                self.record(Event::Exited);
                Ok(Some(ChildExit {
                    exit,
                    stdout,
                    stderr,
                }))
            }
            Behavior::WaitError(msg) => bail!("{}", msg),
            Behavior::SpawnError(msg) => bail!("unexpected spawn error script: {}", msg),
            _ => {
                self.record(Event::DeadlineHit);
                Ok(None)
            }
        }
    }

    async fn terminate(&mut self) -> Result<()> {
        self.record(Event::Terminated);
        Ok(())
    }
}
