//! Command implementations for squad.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the wiring shared by the commands that run agents.

mod monitor;
mod roles;
mod run;
mod serve;

use crate::cli::{Command, ConfigArgs};
use squad::config::ExecutionConfig;
use squad::error::Result;
use squad::process::{ChildRegistry, ProcessRunner};
use squad::roles::RoleRepository;
use squad::squad::SquadOrchestrator;
use squad::telemetry::NdjsonTelemetry;
use std::sync::Arc;

/// Resolve the configuration once, before anything reads it.
pub fn resolve_config(config_args: &ConfigArgs) -> Result<Arc<ExecutionConfig>> {
    Ok(Arc::new(ExecutionConfig::from_process(&config_args.to_flags())?))
}

/// Dispatch a command to its implementation.
pub async fn dispatch(command: Command, config: Arc<ExecutionConfig>) -> Result<()> {
    match command {
        Command::Serve => serve::cmd_serve(config).await,
        Command::Roles(args) => roles::cmd_roles(&config, args).await,
        Command::Run(args) => run::cmd_run(config, args).await,
        Command::Monitor(args) => monitor::cmd_monitor(&config, args).await,
    }
}

/// The collaborators every agent-running command needs.
struct Wiring {
    orchestrator: SquadOrchestrator,
    registry: ChildRegistry,
}

fn wire(config: Arc<ExecutionConfig>) -> Wiring {
    let registry = ChildRegistry::new();
    let runner = ProcessRunner::new(registry.clone()).with_debug(config.overrides.debug);
    let roles = RoleRepository::new(config.agents_directory.clone());
    let telemetry = NdjsonTelemetry::new(config.telemetry_path.clone());

    tracing::debug!(
        engine = %config.engine,
        state_mode = config.state_mode.as_str(),
        agents = %config.agents_directory.display(),
        run_template = %config.run_template_path.display(),
        "configuration resolved"
    );

    Wiring {
        orchestrator: SquadOrchestrator::new(
            config,
            Arc::new(roles),
            runner,
            Arc::new(telemetry),
        ),
        registry,
    }
}
