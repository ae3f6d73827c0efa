//! Error types for squad operations.
//!
//! Uses thiserror for derive macros. Messages are surfaced verbatim to
//! protocol callers, so they name the offending role, template path or
//! command output.

use crate::exit_codes;
use crate::template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for squad operations.
#[derive(Error, Debug)]
pub enum SquadError {
    /// Invalid configuration, unreadable file, or malformed request.
    #[error("{0}")]
    UserError(String),

    /// A member referenced a role id that the role provider does not know.
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// A command template failed to evaluate.
    #[error("Failed to render {kind} {}: {source}", .path.display())]
    Render {
        /// Which template failed ("template" or "create-chat template").
        kind: &'static str,
        /// Source path of the template.
        path: PathBuf,
        /// Underlying evaluation error.
        #[source]
        source: TemplateError,
    },

    /// A command template rendered to whitespace only.
    #[error("Template {} rendered to empty command", .0.display())]
    EmptyCommand(PathBuf),

    /// The create-handle command exited unsuccessfully.
    #[error("Failed to create chat: {0}")]
    CreateHandleFailed(String),

    /// The create-handle command succeeded but printed nothing usable.
    #[error("Failed to extract chatId from create-chat output of {}", .0.display())]
    HandleExtractionFailed(PathBuf),
}

impl SquadError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SquadError::UserError(_) => exit_codes::USER_ERROR,
            SquadError::RoleNotFound(_) => exit_codes::ROLE_FAILURE,
            SquadError::Render { .. } | SquadError::EmptyCommand(_) => {
                exit_codes::TEMPLATE_FAILURE
            }
            SquadError::CreateHandleFailed(_) | SquadError::HandleExtractionFailed(_) => {
                exit_codes::HANDLE_FAILURE
            }
        }
    }
}

/// Result type alias for squad operations.
pub type Result<T> = std::result::Result<T, SquadError>;
