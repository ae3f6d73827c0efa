//! Squad: dispatches role-bound members to command-line AI agents.
//!
//! A caller sends a batch of members (role id plus task). Each member gets a
//! prompt built from its role, rendered into a command template for the
//! configured agent CLI, and run as a supervised shell process. Results come
//! back in request order.
//!
//! The binary exposes this as a stdio JSON-RPC server (`squad serve`) and a
//! handful of CLI commands.

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod process;
pub mod prompt;
pub mod protocol;
pub mod roles;
pub mod squad;
pub mod telemetry;
pub mod template;

#[cfg(test)]
pub(crate) mod test_support;
