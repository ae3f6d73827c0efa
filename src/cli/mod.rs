//! CLI argument parsing for squad.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use squad::config::ConfigFlags;
use std::path::PathBuf;

/// Squad: dispatches role-bound members to command-line AI agents.
///
/// Roles are markdown files, agent invocations are command templates, and
/// every member runs as its own shell process with a timeout.
#[derive(Parser, Debug)]
#[command(name = "squad")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for squad.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve line-delimited JSON-RPC requests on stdin/stdout.
    ///
    /// Methods: `list_roles`, `start_squad_members`. Logs go to stderr.
    Serve,

    /// List the roles in the role directory.
    Roles(RolesArgs),

    /// Run one batch from a JSON request and print the result.
    Run(RunArgs),

    /// Live view of recorded squads and agents.
    ///
    /// Reads the telemetry file and refreshes periodically.
    #[command(alias = "dashboard")]
    Monitor(MonitorArgs),
}

/// Settings shared by every command. Each one beats its environment variable.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML config file with defaults for the settings below.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// stateless or stateful [env: STATE_MODE]
    #[arg(long, global = true)]
    pub state_mode: Option<String>,

    /// cursor-agent, claude or codex [env: ENGINE]
    #[arg(long, global = true)]
    pub engine: Option<String>,

    /// sequential or parallel [env: EXECUTION_MODE]
    #[arg(long, global = true)]
    pub execution_mode: Option<String>,

    /// Shorthand for --execution-mode sequential.
    #[arg(long, global = true)]
    pub sequential: bool,

    /// Run command template [env: RUN_TEMPLATE_PATH]
    #[arg(long, global = true, value_name = "FILE")]
    pub run_template: Option<String>,

    /// Create-chat command template [env: CREATE_CHAT_TEMPLATE_PATH]
    #[arg(long, global = true, value_name = "FILE")]
    pub create_chat_template: Option<String>,

    /// Role directory [env: AGENTS_DIRECTORY_PATH]
    #[arg(long, global = true, value_name = "DIR")]
    pub agents_dir: Option<String>,

    /// Per-process timeout [env: PROCESS_TIMEOUT_MS]
    #[arg(long, global = true, value_name = "MS")]
    pub process_timeout_ms: Option<String>,

    /// Pause between sequential members [env: SEQUENTIAL_DELAY_MS]
    #[arg(long, global = true, value_name = "MS")]
    pub sequential_delay_ms: Option<String>,

    /// Telemetry file [env: SQUAD_TELEMETRY_PATH]
    #[arg(long, global = true, value_name = "FILE")]
    pub telemetry_path: Option<String>,
}

impl ConfigArgs {
    pub fn to_flags(&self) -> ConfigFlags {
        ConfigFlags {
            state_mode: self.state_mode.clone(),
            engine: self.engine.clone(),
            execution_mode: self.execution_mode.clone(),
            sequential: self.sequential,
            run_template: self.run_template.clone(),
            create_chat_template: self.create_chat_template.clone(),
            agents_dir: self.agents_dir.clone(),
            process_timeout_ms: self.process_timeout_ms.clone(),
            sequential_delay_ms: self.sequential_delay_ms.clone(),
            telemetry_path: self.telemetry_path.clone(),
            config_file: self.config.clone(),
        }
    }
}

/// Arguments for the `roles` command.
#[derive(Parser, Debug)]
pub struct RolesArgs {
    /// Print the roles as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Request file (`{"members":[...]}`), or `-` for stdin.
    pub request: String,
}

/// Arguments for the `monitor` command.
#[derive(Parser, Debug)]
pub struct MonitorArgs {
    /// Refresh interval in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Run once and exit (no refresh loop).
    #[arg(long)]
    pub once: bool,

    /// Clear the screen between refreshes.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub clear: bool,

    /// Limit number of squads shown.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["squad", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));
        assert_eq!(cli.config.to_flags(), ConfigFlags::default());
    }

    #[test]
    fn parse_roles_json() {
        let cli = Cli::try_parse_from(["squad", "roles", "--json"]).unwrap();
        if let Command::Roles(args) = cli.command {
            assert!(args.json);
        } else {
            panic!("Expected Roles command");
        }
    }

    #[test]
    fn parse_run_from_stdin() {
        let cli = Cli::try_parse_from(["squad", "run", "-"]).unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.request, "-");
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_monitor_defaults() {
        let cli = Cli::try_parse_from(["squad", "monitor"]).unwrap();
        if let Command::Monitor(args) = cli.command {
            assert_eq!(args.interval_ms, 1000);
            assert!(!args.once);
            assert!(args.clear);
            assert_eq!(args.limit, 10);
        } else {
            panic!("Expected Monitor command");
        }
    }

    #[test]
    fn parse_monitor_no_clear() {
        let cli = Cli::try_parse_from(["squad", "monitor", "--once", "--clear", "false"]).unwrap();
        if let Command::Monitor(args) = cli.command {
            assert!(args.once);
            assert!(!args.clear);
        } else {
            panic!("Expected Monitor command");
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "squad",
            "serve",
            "--engine",
            "claude",
            "--state-mode",
            "stateful",
            "--sequential",
            "--process-timeout-ms",
            "5000",
        ])
        .unwrap();

        let flags = cli.config.to_flags();
        assert_eq!(flags.engine.as_deref(), Some("claude"));
        assert_eq!(flags.state_mode.as_deref(), Some("stateful"));
        assert!(flags.sequential);
        assert_eq!(flags.process_timeout_ms.as_deref(), Some("5000"));
    }

    #[test]
    fn parse_config_file() {
        let cli = Cli::try_parse_from(["squad", "--config", "squad.yaml", "roles"]).unwrap();
        assert_eq!(
            cli.config.to_flags().config_file,
            Some(PathBuf::from("squad.yaml"))
        );
    }
}
