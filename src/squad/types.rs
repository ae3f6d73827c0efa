//! Wire types for one batch.

use crate::process::ProcessOutcome;
use serde::{Deserialize, Serialize};

/// One member of a batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub role_id: String,
    pub task: String,
    /// Working directory, relative to the workspace root unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Conversation handle to resume. `null` and `""` both mean none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl MemberRequest {
    pub fn new(role_id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            task: task.into(),
            cwd: None,
            chat_id: None,
        }
    }

    /// The supplied handle, if it carries anything.
    pub fn handle(&self) -> Option<&str> {
        self.chat_id
            .as_deref()
            .map(str::trim)
            .filter(|handle| !handle.is_empty())
    }
}

/// A batch of members started together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadRequest {
    pub members: Vec<MemberRequest>,
    /// Opaque caller data, accepted and ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator_chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

/// Final state of one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Completed,
    Error,
    Timeout,
}

impl MemberStatus {
    /// A timeout wins over any exit code.
    pub fn from_outcome(outcome: &ProcessOutcome) -> Self {
        if outcome.timed_out {
            MemberStatus::Timeout
        } else if outcome.exit_code == Some(0) {
            MemberStatus::Completed
        } else {
            MemberStatus::Error
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Completed => "completed",
            MemberStatus::Error => "error",
            MemberStatus::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one member, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResult {
    /// `<squadId>-m<index>`.
    pub member_id: String,
    pub role_id: String,
    /// The caller's `cwd`, echoed unresolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub status: MemberStatus,
    pub raw_stdout: String,
    pub raw_stderr: String,
    /// Conversation handle used for this run (stateful mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

/// Response for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadResponse {
    pub squad_id: String,
    pub members: Vec<MemberResult>,
}

/// Member id for position `index` of a squad.
pub fn member_id(squad_id: &str, index: usize) -> String {
    format!("{}-m{}", squad_id, index)
}
