//! Rebuilding current state from the telemetry log.

use super::{AgentStatus, Record, TelemetryEvent};
use crate::error::{Result, SquadError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub originator_id: String,
    pub orchestrator_chat_id: Option<String>,
    pub workspace_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquadRow {
    pub squad_id: String,
    pub originator_id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRow {
    pub agent_id: String,
    pub squad_id: String,
    pub role_name: String,
    pub task: Option<String>,
    pub status: AgentStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Sessions, squads and agents as of the last line of the log.
///
/// Rows keep the order in which they first appeared.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub sessions: Vec<SessionRow>,
    pub squads: Vec<SquadRow>,
    pub agents: Vec<AgentRow>,
    /// Lines that could not be parsed.
    pub skipped: usize,
    session_index: HashMap<String, usize>,
    agent_index: HashMap<String, usize>,
}

impl TelemetrySnapshot {
    /// Load a telemetry file. A missing file is an empty snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::from_ndjson(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SquadError::UserError(format!(
                "failed to read telemetry file '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn from_ndjson(content: &str) -> Self {
        let mut snapshot = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<TelemetryEvent>(line) {
                Ok(event) => snapshot.apply(event),
                Err(_) => snapshot.skipped += 1,
            }
        }
        snapshot
    }

    pub fn apply(&mut self, event: TelemetryEvent) {
        let ts = event.ts;
        match event.record {
            Record::Session(info) => match self.session_index.get(&info.originator_id) {
                Some(&i) => {
                    let row = &mut self.sessions[i];
                    row.last_activity_at = ts;
                    if row.orchestrator_chat_id.is_none() {
                        row.orchestrator_chat_id = info.orchestrator_chat_id;
                    }
                    if row.workspace_id.is_none() {
                        row.workspace_id = info.workspace_id;
                    }
                }
                None => {
                    self.session_index
                        .insert(info.originator_id.clone(), self.sessions.len());
                    self.sessions.push(SessionRow {
                        originator_id: info.originator_id,
                        orchestrator_chat_id: info.orchestrator_chat_id,
                        workspace_id: info.workspace_id,
                        created_at: ts,
                        last_activity_at: ts,
                    });
                }
            },
            Record::Squad(squad) => {
                self.touch(&squad.originator_id, ts);
                self.squads.push(SquadRow {
                    squad_id: squad.squad_id,
                    originator_id: squad.originator_id,
                    label: squad.label,
                    created_at: ts,
                });
            }
            Record::Agent(agent) => {
                self.agent_index
                    .insert(agent.agent_id.clone(), self.agents.len());
                self.agents.push(AgentRow {
                    agent_id: agent.agent_id,
                    squad_id: agent.squad_id,
                    role_name: agent.role_name,
                    task: agent.task,
                    status: agent.status,
                    result: None,
                    error: None,
                    started_at: ts,
                    finished_at: None,
                });
            }
            Record::AgentUpdate(update) => {
                self.touch(&update.originator_id, ts);
                let Some(&i) = self.agent_index.get(&update.agent_id) else {
                    return;
                };
                let row = &mut self.agents[i];
                if let Some(status) = update.status {
                    row.status = status;
                }
                if update.result.is_some() {
                    row.result = update.result;
                }
                if update.error.is_some() {
                    row.error = update.error;
                }
                if update.finished_at.is_some() {
                    row.finished_at = update.finished_at;
                }
            }
        }
    }

    fn touch(&mut self, originator_id: &str, ts: DateTime<Utc>) {
        if let Some(&i) = self.session_index.get(originator_id) {
            self.sessions[i].last_activity_at = ts;
        }
    }

    /// Latest activity across all sessions.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.sessions.iter().map(|s| s.last_activity_at).max()
    }

    pub fn squads_for<'a>(&'a self, originator_id: &'a str) -> impl Iterator<Item = &'a SquadRow> {
        self.squads
            .iter()
            .filter(move |squad| squad.originator_id == originator_id)
    }

    pub fn agents_for<'a>(&'a self, squad_id: &'a str) -> impl Iterator<Item = &'a AgentRow> {
        self.agents
            .iter()
            .filter(move |agent| agent.squad_id == squad_id)
    }

    pub fn count_status(&self, status: AgentStatus) -> usize {
        self.agents.iter().filter(|a| a.status == status).count()
    }
}
