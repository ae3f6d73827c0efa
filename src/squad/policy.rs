//! Scheduling and working-directory rules.

use crate::config::{ConcurrencyMode, ExecutionConfig};
use std::path::{Path, PathBuf};

/// Concurrency for a batch.
///
/// A process-wide override wins, then the configured mode, then the engine
/// default: engines that cannot run side by side go one at a time.
pub fn resolve_concurrency(config: &ExecutionConfig) -> ConcurrencyMode {
    if let Some(forced) = config.overrides.force_concurrency {
        return forced;
    }
    if let Some(configured) = config.concurrency {
        return configured;
    }
    if config.engine.requires_sequential() {
        ConcurrencyMode::Sequential
    } else {
        ConcurrencyMode::Parallel
    }
}

/// Where a member runs. Absent or empty means the workspace root.
pub fn resolve_working_directory(workspace_root: &Path, cwd: Option<&str>) -> PathBuf {
    match cwd.map(str::trim).filter(|cwd| !cwd.is_empty()) {
        Some(cwd) => {
            let path = Path::new(cwd);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                workspace_root.join(path)
            }
        }
        None => workspace_root.to_path_buf(),
    }
}
