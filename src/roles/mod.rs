//! Role definitions and the providers that serve them.
//!
//! A role is a markdown file in the role directory. The file stem is the role
//! id; optional YAML frontmatter supplies the display name and description,
//! and the rest of the file is the instruction text given to the agent.
//!
//! ```text
//! ---
//! name: Frontend Developer
//! description: Builds UI components
//! ---
//!
//! You are a frontend developer...
//! ```

mod parse;
mod repository;


pub use parse::parse_role;
pub use repository::RoleRepository;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A loaded role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role id (the file stem).
    pub id: String,
    /// Display name; falls back to the id.
    pub name: String,
    /// One-line description; empty when the file has none.
    pub description: String,
    /// Instruction text, trimmed.
    pub body: String,
}

/// Source of role definitions.
#[async_trait]
pub trait RoleProvider: Send + Sync {
    /// All known roles, sorted by id.
    async fn list_roles(&self) -> Result<Vec<RoleDefinition>>;

    /// Look up one role. `Ok(None)` means the id is unknown.
    async fn get_role(&self, id: &str) -> Result<Option<RoleDefinition>> {
        Ok(self
            .list_roles()
            .await?
            .into_iter()
            .find(|role| role.id == id))
    }
}
