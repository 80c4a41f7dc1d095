//! Lifecycle supervision for the upstream backend process.
//!
//! The gateway launches the backend as a child process at startup and keeps
//! it running: a nonzero exit schedules one restart after a fixed delay
//! (unbounded total attempts), a zero exit ends supervision, and a gateway
//! shutdown kills the child before the supervisor returns.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn upstream process: {0}")]
    Spawn(#[from] io::Error),
}

/// A running upstream process. `wait` resolves to the exit code, or `None`
/// when the process was terminated by a signal.
#[async_trait]
pub trait UpstreamProcess: Send {
    fn pid(&self) -> Option<u32>;
    async fn wait(&mut self) -> io::Result<Option<i32>>;
    async fn kill(&mut self) -> io::Result<()>;
}

/// The spawn capability, split out so the restart policy is testable without
/// real processes.
#[async_trait]
pub trait ProcessSpawner: Send + Sync + 'static {
    async fn spawn(&self) -> io::Result<Box<dyn UpstreamProcess>>;
}

/// Spawns the configured backend command with stdout/stderr piped into the
/// gateway's own log output.
#[derive(Debug, Clone)]
pub struct UpstreamCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl UpstreamCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl ProcessSpawner for UpstreamCommand {
    async fn spawn(&self) -> io::Result<Box<dyn UpstreamProcess>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_output(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_output(stderr, "stderr"));
        }

        Ok(Box::new(SpawnedUpstream { child }))
    }
}

/// Observability passthrough: child output is streamed line-by-line into our
/// logs, never parsed.
async fn pump_output<R>(reader: R, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if stream == "stderr" {
            tracing::warn!(target: "upstream", "{}", line);
        } else {
            tracing::info!(target: "upstream", "{}", line);
        }
    }
}

struct SpawnedUpstream {
    child: Child,
}

#[async_trait]
impl UpstreamProcess for SpawnedUpstream {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.wait().await?.code())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}

/// Snapshot of the supervised process, replaced (not mutated) on each
/// restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamHandle {
    pub pid: Option<u32>,
    pub restarts: u32,
}

/// Owns the child handle and applies the restart policy. Observers can watch
/// the published [`UpstreamHandle`] to see the current process identity and
/// restart count.
pub struct Supervisor<S> {
    spawner: S,
    restart_delay: Duration,
    handle_tx: watch::Sender<Option<UpstreamHandle>>,
}

impl<S: ProcessSpawner> Supervisor<S> {
    pub fn new(
        spawner: S,
        restart_delay: Duration,
    ) -> (Self, watch::Receiver<Option<UpstreamHandle>>) {
        let (handle_tx, handle_rx) = watch::channel(None);
        (
            Self {
                spawner,
                restart_delay,
                handle_tx,
            },
            handle_rx,
        )
    }

    /// Run until the child exits cleanly or `shutdown` fires. On shutdown the
    /// child is killed before this returns, so no orphaned upstream process
    /// survives a normal gateway exit.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), SupervisorError> {
        let mut restarts: u32 = 0;

        loop {
            let mut child = match self.spawner.spawn().await {
                Ok(child) => child,
                Err(err) => {
                    tracing::error!(error = %err, "failed to start upstream process");
                    // A spawn failure follows the same delayed-restart path
                    // as a crash.
                    if sleep_or_shutdown(self.restart_delay, &mut shutdown).await {
                        return Ok(());
                    }
                    restarts += 1;
                    continue;
                }
            };

            let _ = self.handle_tx.send(Some(UpstreamHandle {
                pid: child.pid(),
                restarts,
            }));
            tracing::info!(pid = ?child.pid(), restarts, "upstream process started");

            tokio::select! {
                status = child.wait() => match status {
                    Ok(Some(0)) => {
                        tracing::info!("upstream process exited cleanly");
                        let _ = self.handle_tx.send(None);
                        return Ok(());
                    }
                    Ok(code) => {
                        tracing::warn!(
                            exit_code = ?code,
                            delay_secs = self.restart_delay.as_secs(),
                            "upstream process exited, scheduling restart"
                        );
                        if sleep_or_shutdown(self.restart_delay, &mut shutdown).await {
                            return Ok(());
                        }
                        restarts += 1;
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to observe upstream process exit");
                        if sleep_or_shutdown(self.restart_delay, &mut shutdown).await {
                            return Ok(());
                        }
                        restarts += 1;
                    }
                },
                _ = shutdown.changed() => {
                    tracing::info!(pid = ?child.pid(), "shutting down upstream process");
                    if let Err(err) = child.kill().await {
                        tracing::warn!(error = %err, "failed to kill upstream process");
                    }
                    let _ = self.handle_tx.send(None);
                    return Ok(());
                }
            }
        }
    }
}

/// Returns true if shutdown fired before the restart delay elapsed.
async fn sleep_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown.changed() => true,
    }
}
