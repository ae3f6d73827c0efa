//! Append-only NDJSON telemetry file.

use super::{AgentPatch, AgentStatus, NewAgent, SessionInfo, TelemetrySink};
use crate::error::{Result, SquadError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One line of the telemetry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// When the record was written.
    pub ts: DateTime<Utc>,
    /// `user@host` of the writing process.
    pub actor: String,
    #[serde(flatten)]
    pub record: Record,
}

impl TelemetryEvent {
    pub fn new(record: Record) -> Self {
        Self {
            ts: Utc::now(),
            actor: actor_string(),
            record,
        }
    }

    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            SquadError::UserError(format!("failed to serialize telemetry record: {}", e))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Session(SessionInfo),
    Squad(SquadCreated),
    Agent(AgentCreated),
    AgentUpdate(AgentUpdated),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadCreated {
    pub squad_id: String,
    pub originator_id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCreated {
    pub agent_id: String,
    pub squad_id: String,
    pub role_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentUpdated {
    pub agent_id: String,
    pub originator_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Telemetry sink writing to an NDJSON file.
///
/// Writes from concurrent members are serialized so lines never interleave.
#[derive(Debug)]
pub struct NdjsonTelemetry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl NdjsonTelemetry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: Record) -> Result<()> {
        let mut line = TelemetryEvent::new(record).to_ndjson_line()?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SquadError::UserError(format!(
                    "failed to create telemetry directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                SquadError::UserError(format!(
                    "failed to open telemetry file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        file.write_all(line.as_bytes()).await.map_err(|e| {
            SquadError::UserError(format!(
                "failed to write telemetry to '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        file.flush().await.map_err(|e| {
            SquadError::UserError(format!(
                "failed to flush telemetry file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for NdjsonTelemetry {
    async fn ensure_session(&self, session: &SessionInfo) -> Result<String> {
        self.append(Record::Session(session.clone())).await?;
        Ok(session.originator_id.clone())
    }

    async fn create_squad(&self, squad_id: &str, originator_id: &str, label: &str) -> Result<()> {
        self.append(Record::Squad(SquadCreated {
            squad_id: squad_id.to_string(),
            originator_id: originator_id.to_string(),
            label: label.to_string(),
        }))
        .await
    }

    async fn create_agent(&self, agent: &NewAgent) -> Result<String> {
        let agent_id = uuid::Uuid::new_v4().to_string();
        self.append(Record::Agent(AgentCreated {
            agent_id: agent_id.clone(),
            squad_id: agent.squad_id.clone(),
            role_name: agent.role_name.clone(),
            task: agent.task.clone(),
            prompt: agent.prompt.clone(),
            status: AgentStatus::Starting,
        }))
        .await?;
        Ok(agent_id)
    }

    async fn update_agent(
        &self,
        originator_id: &str,
        agent_id: &str,
        patch: AgentPatch,
    ) -> Result<()> {
        self.append(Record::AgentUpdate(AgentUpdated {
            agent_id: agent_id.to_string(),
            originator_id: originator_id.to_string(),
            status: patch.status,
            result: patch.result,
            error: patch.error,
            finished_at: patch.finished_at,
        }))
        .await
    }
}
