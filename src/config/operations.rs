//! Config loading, layering and validation.

use super::model::{ConfigFlags, ExecutionConfig, FileConfig, RuntimeOverrides};
use super::types::*;
use crate::error::{Result, SquadError};
use std::path::{Path, PathBuf};
use std::time::Duration;

impl FileConfig {
    /// Load a config file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            SquadError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| SquadError::UserError(format!("failed to parse config YAML: {}", e)))
    }
}

/// Interpret a boolean-ish switch value. `None` for anything unrecognized.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// First non-empty value: flag, then environment, then file.
fn layer(flag: Option<&str>, env: Option<String>, file: Option<&str>) -> Option<String> {
    flag.map(str::to_string)
        .filter(|v| !v.is_empty())
        .or_else(|| env.filter(|v| !v.is_empty()))
        .or_else(|| file.map(str::to_string).filter(|v| !v.is_empty()))
}

fn absolutize(root: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

impl ExecutionConfig {
    /// Resolve configuration from flags, the real environment and the
    /// optional `--config` file, with the current directory as workspace root.
    pub fn from_process(flags: &ConfigFlags) -> Result<Self> {
        let workspace_root = std::env::current_dir().map_err(|e| {
            SquadError::UserError(format!("failed to determine working directory: {}", e))
        })?;

        let file = match &flags.config_file {
            Some(path) => FileConfig::load(absolutize(&workspace_root, &path.to_string_lossy()))?,
            None => FileConfig::default(),
        };

        Self::resolve(flags, &|key| std::env::var(key).ok(), &file, workspace_root)
    }

    /// Layer the sources and validate the result.
    ///
    /// `env` looks up environment variables; tests pass a map instead of
    /// touching the process environment.
    pub fn resolve(
        flags: &ConfigFlags,
        env: &dyn Fn(&str) -> Option<String>,
        file: &FileConfig,
        workspace_root: PathBuf,
    ) -> Result<Self> {
        let state_mode = match layer(
            flags.state_mode.as_deref(),
            env("STATE_MODE"),
            file.state_mode.as_deref(),
        ) {
            Some(value) => StateMode::from_str(&value).ok_or_else(|| {
                SquadError::UserError(format!(
                    "Invalid STATE_MODE: {}. Must be 'stateless' or 'stateful'",
                    value
                ))
            })?,
            None => StateMode::default(),
        };

        let engine = match layer(flags.engine.as_deref(), env("ENGINE"), file.engine.as_deref()) {
            Some(value) => Engine::from_str(&value).ok_or_else(|| {
                SquadError::UserError(format!(
                    "Invalid ENGINE: {}. Must be 'cursor-agent', 'claude', or 'codex'",
                    value
                ))
            })?,
            None => Engine::default(),
        };

        // --execution-mode beats --sequential, which beats the environment.
        let execution_mode = flags
            .execution_mode
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| flags.sequential.then(|| "sequential".to_string()))
            .or_else(|| layer(None, env("EXECUTION_MODE"), file.execution_mode.as_deref()));
        let concurrency = match execution_mode {
            Some(value) => Some(ConcurrencyMode::from_str(&value).ok_or_else(|| {
                SquadError::UserError(format!(
                    "Invalid EXECUTION_MODE: {}. Must be 'sequential' or 'parallel'",
                    value
                ))
            })?),
            None => None,
        };

        let custom_run_template = layer(
            flags.run_template.as_deref(),
            env("RUN_TEMPLATE_PATH"),
            file.run_template_path.as_deref(),
        );
        if custom_run_template.is_some() && concurrency.is_none() {
            return Err(SquadError::UserError(
                "EXECUTION_MODE is required when providing RUN_TEMPLATE_PATH. \
                 Set EXECUTION_MODE=sequential|parallel or pass --execution-mode."
                    .to_string(),
            ));
        }
        let run_template_path = absolutize(
            &workspace_root,
            &custom_run_template.unwrap_or_else(|| engine.default_run_template()),
        );

        let create_chat_template_path = layer(
            flags.create_chat_template.as_deref(),
            env("CREATE_CHAT_TEMPLATE_PATH"),
            file.create_chat_template_path.as_deref(),
        )
        .or_else(|| {
            (state_mode == StateMode::Stateful).then(|| engine.default_create_chat_template())
        })
        .map(|path| absolutize(&workspace_root, &path));

        let agents_directory = absolutize(
            &workspace_root,
            &layer(
                flags.agents_dir.as_deref(),
                env("AGENTS_DIRECTORY_PATH"),
                file.agents_directory_path.as_deref(),
            )
            .unwrap_or_else(|| DEFAULT_AGENTS_DIRECTORY.to_string()),
        );

        let timeout_ms = match layer(
            flags.process_timeout_ms.as_deref(),
            env("PROCESS_TIMEOUT_MS"),
            None,
        ) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| {
                    SquadError::UserError(format!(
                        "Invalid PROCESS_TIMEOUT_MS: {}. Must be a positive integer",
                        value
                    ))
                })?,
            None => file.process_timeout_ms.unwrap_or(DEFAULT_PROCESS_TIMEOUT_MS),
        };
        if timeout_ms == 0 {
            return Err(SquadError::UserError(
                "Invalid PROCESS_TIMEOUT_MS: 0. Must be a positive integer".to_string(),
            ));
        }

        let delay_ms = match layer(
            flags.sequential_delay_ms.as_deref(),
            env("SEQUENTIAL_DELAY_MS"),
            None,
        ) {
            Some(value) => parse_delay_ms(&value),
            None => file
                .sequential_delay_ms
                .map(|ms| ms.max(0) as u64)
                .unwrap_or(DEFAULT_SEQUENTIAL_DELAY_MS),
        };

        let telemetry_path = layer(
            flags.telemetry_path.as_deref(),
            env("SQUAD_TELEMETRY_PATH"),
            file.telemetry_path.as_deref(),
        )
        .map(|path| absolutize(&workspace_root, &path))
        .unwrap_or_else(default_telemetry_path);

        let debug = env("PROCESS_RUNNER_DEBUG")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(false);
        let force_concurrency = env("PROCESS_RUNNER_SERIALIZE")
            .and_then(|v| parse_flag(&v))
            .map(|serialize| {
                if serialize {
                    ConcurrencyMode::Sequential
                } else {
                    ConcurrencyMode::Parallel
                }
            });

        Ok(Self {
            state_mode,
            engine,
            concurrency,
            run_template_path,
            create_chat_template_path,
            agents_directory,
            workspace_root,
            process_timeout: Duration::from_millis(timeout_ms),
            sequential_delay: Duration::from_millis(delay_ms),
            telemetry_path,
            overrides: RuntimeOverrides {
                debug,
                force_concurrency,
            },
        })
    }

    /// Configuration with every default, rooted at `workspace_root`.
    pub fn defaults(workspace_root: PathBuf) -> Result<Self> {
        Self::resolve(
            &ConfigFlags::default(),
            &|_| None,
            &FileConfig::default(),
            workspace_root,
        )
    }
}

/// Unparsable delays fall back to one second; negative ones clamp to zero.
fn parse_delay_ms(value: &str) -> u64 {
    match value.trim().parse::<i64>() {
        Ok(ms) => ms.max(0) as u64,
        Err(_) => FALLBACK_SEQUENTIAL_DELAY_MS,
    }
}

fn default_telemetry_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_TELEMETRY_FILE)
}
