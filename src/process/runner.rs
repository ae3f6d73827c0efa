//! Timeout-enforcing process runner.

use super::{ChildRegistry, ProcessOutcome, ShellSpawner, Signal, SpawnedChild, Spawner};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Time between SIGTERM and SIGKILL, and between SIGKILL and giving up.
pub const KILL_GRACE: Duration = Duration::from_secs(1);

/// How long to keep collecting output once the child has exited.
pub const DRAIN_WINDOW: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 8 * 1024;

/// Kill escalation state for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supervision {
    Running,
    TerminationRequested,
    ForceKillRequested,
    Exited,
}

impl Supervision {
    /// State after the supervision timer fires. `None` means give up waiting.
    pub fn escalate(self) -> Option<Self> {
        match self {
            Supervision::Running => Some(Supervision::TerminationRequested),
            Supervision::TerminationRequested => Some(Supervision::ForceKillRequested),
            Supervision::ForceKillRequested | Supervision::Exited => None,
        }
    }

    /// Signal to send on entering this state.
    pub fn signal(self) -> Option<Signal> {
        match self {
            Supervision::TerminationRequested => Some(Signal::Terminate),
            Supervision::ForceKillRequested => Some(Signal::Kill),
            Supervision::Running | Supervision::Exited => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Runs one command at a time per call; calls are independent of each other.
#[derive(Clone)]
pub struct ProcessRunner {
    spawner: Arc<dyn Spawner>,
    registry: ChildRegistry,
    debug: bool,
    grace: Duration,
    drain_window: Duration,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("registry", &self.registry)
            .field("debug", &self.debug)
            .field("grace", &self.grace)
            .field("drain_window", &self.drain_window)
            .finish()
    }
}

impl ProcessRunner {
    /// A runner that spawns through `sh -c`.
    pub fn new(registry: ChildRegistry) -> Self {
        Self::with_spawner(Arc::new(ShellSpawner), registry)
    }

    pub fn with_spawner(spawner: Arc<dyn Spawner>, registry: ChildRegistry) -> Self {
        Self {
            spawner,
            registry,
            debug: false,
            grace: KILL_GRACE,
            drain_window: DRAIN_WINDOW,
        }
    }

    /// Log every spawn at info level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Override the escalation grace window.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn registry(&self) -> &ChildRegistry {
        &self.registry
    }

    /// Run `command_line` in `cwd`, killing it if it outlives `timeout`.
    pub async fn run(&self, command_line: &str, cwd: &Path, timeout: Duration) -> ProcessOutcome {
        if self.debug {
            tracing::info!(
                "spawn command=\"{}\" cwd=\"{}\"",
                command_line,
                cwd.display()
            );
        } else {
            tracing::debug!(command = command_line, cwd = %cwd.display(), "spawning child");
        }

        let child = match self.spawner.spawn(command_line, cwd) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(error = %e, cwd = %cwd.display(), "failed to spawn child");
                return ProcessOutcome {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    timed_out: false,
                };
            }
        };

        self.supervise(child, timeout).await
    }

    async fn supervise(&self, child: SpawnedChild, timeout: Duration) -> ProcessOutcome {
        let SpawnedChild {
            pid,
            stdin,
            stdout,
            stderr,
            mut exit,
            signaller,
        } = child;

        // Agents get no input.
        drop(stdin);

        let _tracked = pid.map(|pid| self.registry.track(pid, Arc::clone(&signaller)));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut readers: Vec<JoinHandle<()>> = Vec::new();
        if let Some(pipe) = stdout {
            readers.push(spawn_reader(pipe, Stream::Stdout, tx.clone()));
        }
        if let Some(pipe) = stderr {
            readers.push(spawn_reader(pipe, Stream::Stderr, tx.clone()));
        }
        drop(tx);

        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut collect = |stream: Stream, bytes: Vec<u8>| match stream {
            Stream::Stdout => out.extend_from_slice(&bytes),
            Stream::Stderr => err.extend_from_slice(&bytes),
        };

        let mut state = Supervision::Running;
        let mut deadline = Instant::now() + timeout;
        let mut receiving = true;
        let mut exit_result = None;

        loop {
            tokio::select! {
                result = &mut exit => {
                    exit_result = Some(result);
                    break;
                }
                chunk = rx.recv(), if receiving => match chunk {
                    Some((stream, bytes)) => collect(stream, bytes),
                    None => receiving = false,
                },
                () = sleep_until(deadline) => {
                    let Some(next) = state.escalate() else {
                        tracing::warn!(?pid, "child ignored SIGKILL, abandoning supervision");
                        break;
                    };
                    state = next;
                    if let (Some(pid), Some(signal)) = (pid, state.signal()) {
                        tracing::debug!(pid, ?signal, "timeout escalation");
                        if let Err(e) = signaller.signal(signal) {
                            tracing::debug!(pid, ?signal, error = %e, "failed to signal child");
                        }
                    }
                    deadline = Instant::now() + self.grace;
                }
            }
        }

        let timed_out = state != Supervision::Running;

        // Output still buffered in the pipes after exit.
        if receiving {
            let drain = async {
                while let Some((stream, bytes)) = rx.recv().await {
                    collect(stream, bytes);
                }
            };
            if tokio::time::timeout(self.drain_window, drain).await.is_err() {
                tracing::debug!(?pid, "output pipes still open after exit, stopped draining");
            }
        }
        for reader in readers {
            reader.abort();
        }

        let mut stderr = String::from_utf8_lossy(&err).into_owned();
        let exit_code = match exit_result {
            Some(Ok(code)) if !timed_out => code,
            Some(Err(e)) => {
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&e.to_string());
                None
            }
            _ => None,
        };

        ProcessOutcome {
            exit_code,
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr,
            timed_out,
        }
    }
}

fn spawn_reader(
    mut pipe: Box<dyn AsyncRead + Send + Unpin>,
    stream: Stream,
    tx: mpsc::UnboundedSender<(Stream, Vec<u8>)>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(?stream, error = %e, "error reading child output");
                    break;
                }
            }
        }
    })
}
