//! The spawned child as a capability value.

use futures::future::BoxFuture;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Command;

/// Signals the runner sends during kill escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGTERM.
    Terminate,
    /// SIGKILL.
    Kill,
}

/// Delivers signals to a running child (and its process group).
pub trait Signaller: Send + Sync {
    fn signal(&self, signal: Signal) -> io::Result<()>;
}

/// Everything the runner needs to supervise one child.
///
/// `exit` resolves with the exit code, or `None` when the child died from a
/// signal. Dropping it releases the child.
pub struct SpawnedChild {
    /// OS process id. Without one, no signals are ever sent.
    pub pid: Option<u32>,
    pub stdin: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    pub stdout: Option<Box<dyn AsyncRead + Send + Unpin>>,
    pub stderr: Option<Box<dyn AsyncRead + Send + Unpin>>,
    pub exit: BoxFuture<'static, io::Result<Option<i32>>>,
    pub signaller: Arc<dyn Signaller>,
}

/// Starts child processes.
pub trait Spawner: Send + Sync {
    fn spawn(&self, command_line: &str, cwd: &Path) -> io::Result<SpawnedChild>;
}

/// Runs command lines through `sh -c`, each in a fresh process group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellSpawner;

impl Spawner for ShellSpawner {
    fn spawn(&self, command_line: &str, cwd: &Path) -> io::Result<SpawnedChild> {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(command_line)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let pid = child.id();

        let stdin = child
            .stdin
            .take()
            .map(|pipe| Box::new(pipe) as Box<dyn AsyncWrite + Send + Unpin>);
        let stdout = child
            .stdout
            .take()
            .map(|pipe| Box::new(pipe) as Box<dyn AsyncRead + Send + Unpin>);
        let stderr = child
            .stderr
            .take()
            .map(|pipe| Box::new(pipe) as Box<dyn AsyncRead + Send + Unpin>);

        let exit = Box::pin(async move { child.wait().await.map(|status| status.code()) });

        Ok(SpawnedChild {
            pid,
            stdin,
            stdout,
            stderr,
            exit,
            signaller: Arc::new(ProcessGroup { pgid: pid }),
        })
    }
}

/// Signals a whole process group, so shells and their children go down together.
#[derive(Debug, Clone, Copy)]
struct ProcessGroup {
    pgid: Option<u32>,
}

impl Signaller for ProcessGroup {
    fn signal(&self, signal: Signal) -> io::Result<()> {
        match self.pgid {
            Some(pgid) => signal_group(pgid, signal),
            None => Ok(()),
        }
    }
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: Signal) -> io::Result<()> {
    let signo = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(-pgid, signo) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn signal_group(_pgid: u32, _signal: Signal) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process group signals are only supported on unix",
    ))
}
