//! Execution configuration for squad.
//!
//! Settings are layered once at startup, highest priority first: command-line
//! flag, environment variable, the YAML file passed with `--config`, built-in
//! default. The result is one immutable [`ExecutionConfig`] that is passed
//! explicitly to everything that needs it.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::{ConfigFlags, ExecutionConfig, FileConfig, RuntimeOverrides};
pub use operations::parse_flag;
pub use types::{ConcurrencyMode, Engine, StateMode};
