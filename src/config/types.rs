//! Configuration enums and defaults.

use serde::{Deserialize, Serialize};

/// Default role directory, relative to the workspace root.
pub const DEFAULT_AGENTS_DIRECTORY: &str = "agents";

/// Default per-process timeout.
pub const DEFAULT_PROCESS_TIMEOUT_MS: u64 = 600_000;

/// Default pause between sequential members.
pub const DEFAULT_SEQUENTIAL_DELAY_MS: u64 = 100;

/// Pause used when the configured delay is not a number.
pub const FALLBACK_SEQUENTIAL_DELAY_MS: u64 = 1000;

/// Telemetry file under the home directory.
pub const DEFAULT_TELEMETRY_FILE: &str = ".gs-squad/telemetry.ndjson";

/// Whether members share a persistent conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StateMode {
    /// Every member run is a fresh agent process.
    #[default]
    Stateless,
    /// Members create or resume a conversation handle.
    Stateful,
}

impl StateMode {
    /// Parse a state mode from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stateless" => Some(Self::Stateless),
            "stateful" => Some(Self::Stateful),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stateless => "stateless",
            Self::Stateful => "stateful",
        }
    }
}

/// The agent CLI that templates target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    #[default]
    CursorAgent,
    Claude,
    Codex,
}

impl Engine {
    /// Parse an engine id from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cursor-agent" => Some(Self::CursorAgent),
            "claude" => Some(Self::Claude),
            "codex" => Some(Self::Codex),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CursorAgent => "cursor-agent",
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }

    /// Engines whose CLI misbehaves when several instances run at once.
    pub fn requires_sequential(self) -> bool {
        matches!(self, Self::CursorAgent)
    }

    pub fn default_run_template(self) -> String {
        format!("templates/run-{}.template", self.as_str())
    }

    pub fn default_create_chat_template(self) -> String {
        format!("templates/create-chat-{}.template", self.as_str())
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the members of one batch are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// One member at a time, in request order.
    Sequential,
    /// All members at once.
    Parallel,
}

impl ConcurrencyMode {
    /// Parse an execution mode from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(Self::Sequential),
            "parallel" => Some(Self::Parallel),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

impl std::fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
