//! Child process supervision.
//!
//! Every agent invocation runs as `sh -c <command line>` in its own process
//! group, with stdin closed, stdout and stderr captured, and a timeout that
//! escalates from SIGTERM to SIGKILL:
//!
//! ```text
//! Running --timeout--> TerminationRequested --1s--> ForceKillRequested --1s--> abandoned
//!    \                        \                            \
//!     +-----------------------+----------------------------+--exit--> Exited
//! ```
//!
//! The runner never fails. Spawn errors, signal deaths and timeouts all come
//! back as a [`ProcessOutcome`] with whatever output was captured.

mod child;
mod registry;
mod runner;


pub use child::{ShellSpawner, Signal, Signaller, SpawnedChild, Spawner};
pub use registry::{ChildRegistry, TrackedChild};
pub use runner::{ProcessRunner, Supervision};

/// What happened to one child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code. `None` on spawn failure, timeout, or death by signal.
    pub exit_code: Option<i32>,
    /// Everything the child wrote to stdout.
    pub stdout: String,
    /// Everything the child wrote to stderr, plus any spawn error.
    pub stderr: String,
    /// Whether the timeout fired before the child exited.
    pub timed_out: bool,
}

impl ProcessOutcome {
    /// Whether the process exited with code 0 before the timeout.
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}
