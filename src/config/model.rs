//! Configuration structs.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide switches that sit above the regular settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeOverrides {
    /// Log every spawned command (`PROCESS_RUNNER_DEBUG`).
    pub debug: bool,
    /// Force a concurrency mode for every batch (`PROCESS_RUNNER_SERIALIZE`).
    pub force_concurrency: Option<ConcurrencyMode>,
}

/// Resolved configuration. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub state_mode: StateMode,
    pub engine: Engine,
    /// Explicit concurrency mode, if one was configured.
    pub concurrency: Option<ConcurrencyMode>,
    pub run_template_path: PathBuf,
    /// Only set in stateful mode.
    pub create_chat_template_path: Option<PathBuf>,
    pub agents_directory: PathBuf,
    /// Directory that relative member working directories resolve against.
    pub workspace_root: PathBuf,
    pub process_timeout: Duration,
    pub sequential_delay: Duration,
    pub telemetry_path: PathBuf,
    pub overrides: RuntimeOverrides,
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFlags {
    pub state_mode: Option<String>,
    pub engine: Option<String>,
    pub execution_mode: Option<String>,
    pub sequential: bool,
    pub run_template: Option<String>,
    pub create_chat_template: Option<String>,
    pub agents_dir: Option<String>,
    pub process_timeout_ms: Option<String>,
    pub sequential_delay_ms: Option<String>,
    pub telemetry_path: Option<String>,
    pub config_file: Option<PathBuf>,
}

/// Optional YAML config file.
///
/// Keys mirror the environment variable names in snake case. Unknown keys
/// are ignored for forward compatibility.
///
/// ```yaml
/// state_mode: stateful
/// engine: claude
/// execution_mode: parallel
/// agents_directory_path: roles
/// process_timeout_ms: 300000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub state_mode: Option<String>,
    pub engine: Option<String>,
    pub execution_mode: Option<String>,
    pub run_template_path: Option<String>,
    pub create_chat_template_path: Option<String>,
    pub agents_directory_path: Option<String>,
    pub process_timeout_ms: Option<u64>,
    pub sequential_delay_ms: Option<i64>,
    pub telemetry_path: Option<String>,
}
