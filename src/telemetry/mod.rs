//! Best-effort telemetry for squads and their agents.
//!
//! The orchestrator reports three kinds of rows: a session per originator
//! (the calling chat, workspace or directory), a squad per batch, and an agent
//! per member. Sinks may fail; callers log the failure and carry on.
//!
//! The file sink appends one JSON object per line:
//!
//! ```text
//! {"ts":"2026-01-05T10:00:00Z","actor":"dev@host","kind":"session","originatorId":"chat-1",...}
//! {"ts":"2026-01-05T10:00:00Z","actor":"dev@host","kind":"squad","squadId":"...","label":"qa,frontend",...}
//! {"ts":"2026-01-05T10:00:01Z","actor":"dev@host","kind":"agent","agentId":"...","status":"starting",...}
//! {"ts":"2026-01-05T10:00:09Z","actor":"dev@host","kind":"agent_update","agentId":"...","status":"done",...}
//! ```

mod ndjson;
mod snapshot;

#[cfg(test)]
mod tests;

pub use ndjson::{
    AgentCreated, AgentUpdated, NdjsonTelemetry, Record, SquadCreated, TelemetryEvent,
};
pub use snapshot::{AgentRow, SessionRow, SquadRow, TelemetrySnapshot};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one agent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Starting,
    Running,
    Done,
    Error,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Starting => write!(f, "starting"),
            AgentStatus::Running => write!(f, "running"),
            AgentStatus::Done => write!(f, "done"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

/// Who a squad was started for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// `orchestratorChatId`, else `workspaceId`, else the workspace root.
    pub originator_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

impl SessionInfo {
    pub fn resolve(
        orchestrator_chat_id: Option<String>,
        workspace_id: Option<String>,
        workspace_root: &str,
    ) -> Self {
        let originator_id = orchestrator_chat_id
            .clone()
            .or_else(|| workspace_id.clone())
            .unwrap_or_else(|| workspace_root.to_string());
        Self {
            originator_id,
            orchestrator_chat_id,
            workspace_id: workspace_id.or_else(|| Some(workspace_root.to_string())),
        }
    }
}

/// A new agent row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    pub squad_id: String,
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Fields to change on an existing agent row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl AgentPatch {
    pub fn status(status: AgentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn done(result: impl Into<String>) -> Self {
        Self {
            status: Some(AgentStatus::Done),
            result: Some(result.into()),
            error: None,
            finished_at: Some(Utc::now()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(AgentStatus::Error),
            result: None,
            error: Some(error.into()),
            finished_at: Some(Utc::now()),
        }
    }
}

/// Recorder for squad activity.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Create or refresh the session row. Returns the originator id.
    async fn ensure_session(&self, session: &SessionInfo) -> Result<String>;

    /// Record a new squad under an originator.
    async fn create_squad(&self, squad_id: &str, originator_id: &str, label: &str) -> Result<()>;

    /// Record a new agent in `starting` state. Returns the agent id.
    async fn create_agent(&self, agent: &NewAgent) -> Result<String>;

    /// Apply a patch to an agent row.
    async fn update_agent(&self, originator_id: &str, agent_id: &str, patch: AgentPatch)
    -> Result<()>;
}

/// Sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

#[async_trait]
impl TelemetrySink for NoopTelemetry {
    async fn ensure_session(&self, session: &SessionInfo) -> Result<String> {
        Ok(session.originator_id.clone())
    }

    async fn create_squad(&self, _squad_id: &str, _originator_id: &str, _label: &str) -> Result<()> {
        Ok(())
    }

    async fn create_agent(&self, _agent: &NewAgent) -> Result<String> {
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn update_agent(
        &self,
        _originator_id: &str,
        _agent_id: &str,
        _patch: AgentPatch,
    ) -> Result<()> {
        Ok(())
    }
}
