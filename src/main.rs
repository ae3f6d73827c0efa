//! Squad: dispatches role-bound members to command-line AI agents.
//!
//! This is the main entry point for the `squad` CLI. It parses arguments,
//! starts logging and the async runtime, dispatches to the appropriate
//! command handler, and handles errors with proper exit codes.

mod cli;
mod commands;

use anyhow::Context;
use cli::Cli;
use squad::{exit_codes, logging};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let config = match commands::resolve_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(err.exit_code() as u8);
        }
    };
    logging::init(config.overrides.debug);

    let runtime = match tokio::runtime::Runtime::new().context("failed to start async runtime") {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::from(exit_codes::USER_ERROR as u8);
        }
    };

    let result = runtime.block_on(commands::dispatch(cli.command, config));
    // A blocked stdin read must not hold the process open after a signal.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
