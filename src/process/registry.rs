//! Live child tracking for shutdown.

use super::{Signal, Signaller};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process ids of every child that is currently running.
///
/// The only state shared between runner invocations. A shutdown hook calls
/// [`ChildRegistry::kill_all`] so no agent outlives the server.
#[derive(Clone, Default)]
pub struct ChildRegistry {
    children: Arc<Mutex<HashMap<u32, Arc<dyn Signaller>>>>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, Arc<dyn Signaller>>> {
        self.children
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Track a child until the returned guard is dropped.
    pub fn track(&self, pid: u32, signaller: Arc<dyn Signaller>) -> TrackedChild {
        self.lock().insert(pid, signaller);
        TrackedChild {
            registry: self.clone(),
            pid,
        }
    }

    /// Number of children currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// SIGKILL every tracked child. Returns how many were signalled.
    pub fn kill_all(&self) -> usize {
        let children: Vec<(u32, Arc<dyn Signaller>)> = self
            .lock()
            .iter()
            .map(|(pid, signaller)| (*pid, Arc::clone(signaller)))
            .collect();

        for (pid, signaller) in &children {
            if let Err(e) = signaller.signal(Signal::Kill) {
                tracing::debug!(pid, error = %e, "failed to kill tracked child");
            }
        }
        children.len()
    }
}

impl std::fmt::Debug for ChildRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pids: Vec<u32> = self.lock().keys().copied().collect();
        pids.sort_unstable();
        f.debug_struct("ChildRegistry").field("pids", &pids).finish()
    }
}

/// Removes its child from the registry when dropped.
#[derive(Debug)]
pub struct TrackedChild {
    registry: ChildRegistry,
    pid: u32,
}

impl Drop for TrackedChild {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.pid);
    }
}
