//! Directory-backed role provider.

use super::{RoleDefinition, RoleProvider, parse_role};
use crate::error::{Result, SquadError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Loads `*.md` role files from a directory once and serves them from memory.
///
/// The directory is scanned on first use. Files added later are not picked
/// up until the process restarts.
#[derive(Debug)]
pub struct RoleRepository {
    directory: PathBuf,
    cache: OnceCell<Vec<RoleDefinition>>,
}

impl RoleRepository {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            cache: OnceCell::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    async fn load(&self) -> Result<Vec<RoleDefinition>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    directory = %self.directory.display(),
                    "role directory does not exist, no roles available"
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(SquadError::UserError(format!(
                    "failed to read role directory '{}': {}",
                    self.directory.display(),
                    e
                )));
            }
        };

        let mut roles = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            SquadError::UserError(format!(
                "failed to read role directory '{}': {}",
                self.directory.display(),
                e
            ))
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable role file");
                    continue;
                }
            };

            match parse_role(id, &content) {
                Ok(role) => roles.push(role),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed role file");
                }
            }
        }

        roles.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::debug!(
            directory = %self.directory.display(),
            count = roles.len(),
            "loaded roles"
        );
        Ok(roles)
    }
}

#[async_trait]
impl RoleProvider for RoleRepository {
    async fn list_roles(&self) -> Result<Vec<RoleDefinition>> {
        let roles = self.cache.get_or_try_init(|| self.load()).await?;
        Ok(roles.clone())
    }

    async fn get_role(&self, id: &str) -> Result<Option<RoleDefinition>> {
        let roles = self.cache.get_or_try_init(|| self.load()).await?;
        Ok(roles.iter().find(|role| role.id == id).cloned())
    }
}
