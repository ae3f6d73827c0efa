use crate::config::{ConfigFlags, ExecutionConfig, FileConfig};
use crate::process::{ChildRegistry, ProcessRunner};
use crate::roles::RoleRepository;
use crate::squad::SquadOrchestrator;
use crate::telemetry::NoopTelemetry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A throwaway workspace with an `agents/` role directory.
pub(crate) struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Workspace with two roles, `frontend` and `qa`.
    pub(crate) fn new() -> Self {
        let workspace = Self {
            dir: TempDir::new().unwrap(),
        };
        workspace.write_role(
            "frontend",
            "---\nname: Frontend Developer\ndescription: Builds UI components\n---\n\nYou build UI components.\n",
        );
        workspace.write_role(
            "qa",
            "---\nname: QA Engineer\ndescription: Tests things\n---\n\nYou test things.\n",
        );
        workspace
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn write_role(&self, id: &str, content: &str) {
        self.write_file(&format!("agents/{}.md", id), content);
    }

    /// Write a file relative to the workspace root, creating parents.
    pub(crate) fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Resolve a config rooted here from fake environment variables.
    ///
    /// Telemetry goes to a file inside the workspace unless overridden.
    pub(crate) fn config(&self, env: &[(&str, &str)]) -> ExecutionConfig {
        let mut env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.entry("SQUAD_TELEMETRY_PATH".to_string())
            .or_insert_with(|| "telemetry.ndjson".to_string());

        ExecutionConfig::resolve(
            &ConfigFlags::default(),
            &|key| env.get(key).cloned(),
            &FileConfig::default(),
            self.root().to_path_buf(),
        )
        .unwrap()
    }

    /// Orchestrator over this workspace's roles with telemetry disabled.
    pub(crate) fn orchestrator(&self, config: ExecutionConfig) -> SquadOrchestrator {
        let roles = RoleRepository::new(config.agents_directory.clone());
        SquadOrchestrator::new(
            Arc::new(config),
            Arc::new(roles),
            ProcessRunner::new(ChildRegistry::new()),
            Arc::new(NoopTelemetry),
        )
    }
}
