//! Local runner implementation
//!
//! Executes programs directly on the host with `tokio::process`. Each child
//! is placed in its own process group so a timeout can kill the program
//! together with anything it forked.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{ChildExit, ChildProcess, CommandSpec, ExitKind, ProcessRunner};

/// Runner that executes programs directly without sandbox
#[derive(Debug, Default, Clone)]
pub struct LocalRunner;

impl LocalRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for LocalRunner {
    async fn spawn(&self, spec: &CommandSpec) -> Result<Box<dyn ChildProcess>> {
        debug!("Spawning: {:?} with args: {:?}", spec.program, spec.args);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &spec.work_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{}`", spec))?;

        // Leader pid doubles as the group id; tokio forgets it once reaped
        let pgid = child.id();
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        Ok(Box::new(LocalChild {
            child,
            pgid,
            stdin_task: None,
            stdout,
            stderr,
        }))
    }
}

/// Read a pipe to the end in the background so the child never blocks on a
/// full pipe while we wait for it.
fn drain<R>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).await?;
        Ok(buf)
    })
}

async fn collect(task: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match task {
        Some(handle) => Ok(handle
            .await
            .context("Output reader task failed")?
            .context("Failed to read child output")?),
        None => Ok(Vec::new()),
    }
}

struct LocalChild {
    child: Child,
    /// Process group of the child, recorded at spawn
    #[cfg_attr(not(unix), allow(dead_code))]
    pgid: Option<u32>,
    stdin_task: Option<JoinHandle<()>>,
    stdout: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    stderr: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

#[async_trait]
impl ChildProcess for LocalChild {
    async fn write_stdin(&mut self, input: Vec<u8>) -> Result<()> {
        let Some(mut stdin) = self.child.stdin.take() else {
            return Ok(());
        };

        // Written in the background: a program that never reads its input
        // must still be subject to the deadline.
        self.stdin_task = Some(tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                // The program may exit without consuming all of its input
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    debug!("Failed to write child stdin: {}", e);
                }
            }
        }));

        Ok(())
    }

    async fn wait_with_deadline(&mut self, deadline: Duration) -> Result<Option<ChildExit>> {
        let child = &mut self.child;
        let stdout = self.stdout.take();
        let stderr = self.stderr.take();

        let finished = async move {
            let status = child.wait().await.context("Failed to wait for child")?;
            let stdout = collect(stdout).await?;
            let stderr = collect(stderr).await?;
            Ok::<_, anyhow::Error>(ChildExit {
                exit: exit_kind(status),
                stdout,
                stderr,
            })
        };

        match tokio::time::timeout(deadline, finished).await {
            Ok(result) => result.map(Some),
            Err(_) => {
                debug!("Deadline of {:?} elapsed", deadline);
                Ok(None)
            }
        }
    }

    async fn terminate(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            // The group outlives its leader while grandchildren are running,
            // even when the leader itself has already been reaped
            if let Some(pgid) = self.pgid {
                if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                    debug!("killpg({}) failed: {}", pgid, e);
                }
            }
        }

        if let Err(e) = self.child.start_kill() {
            // Already exited on its own
            debug!("start_kill failed: {}", e);
        }
        self.child
            .wait()
            .await
            .context("Failed to reap terminated child")?;

        if let Some(task) = self.stdin_task.take() {
            task.abort();
        }
        Ok(())
    }
}

fn exit_kind(status: ExitStatus) -> ExitKind {
    if let Some(code) = status.code() {
        return ExitKind::Code(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return ExitKind::Signal(sig);
        }
    }

    ExitKind::Code(-1)
}
