//! Implementation of the `squad monitor` command.
//!
//! A refresh-based dashboard over the telemetry file, kept cross-platform
//! without pulling in a full TUI dependency stack. It uses ANSI escape codes
//! to clear the screen between refreshes.

use crate::cli::MonitorArgs;
use chrono::{DateTime, Utc};
use squad::config::ExecutionConfig;
use squad::error::Result;
use squad::telemetry::{AgentRow, AgentStatus, SquadRow, TelemetrySnapshot};
use std::io::{self, Write};
use std::time::Duration;

pub async fn cmd_monitor(config: &ExecutionConfig, args: MonitorArgs) -> Result<()> {
    loop {
        let snapshot = TelemetrySnapshot::load(&config.telemetry_path)?;
        if args.clear {
            clear_screen();
        }
        print!("{}", render(config, &snapshot, &args, Utc::now()));
        io::stdout().flush().ok();

        if args.once {
            break;
        }

        tokio::time::sleep(Duration::from_millis(args.interval_ms.max(50))).await;
    }

    Ok(())
}

fn render(
    config: &ExecutionConfig,
    snapshot: &TelemetrySnapshot,
    args: &MonitorArgs,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&text);
        out.push('\n');
    };

    line("Squad Monitor  (Ctrl+C to exit)".to_string());
    line(format!("Updated:   {}", now.format("%Y-%m-%d %H:%M:%S UTC")));
    line(format!("Telemetry: {}", config.telemetry_path.display()));
    line(String::new());

    line("Agents:".to_string());
    for status in [
        AgentStatus::Starting,
        AgentStatus::Running,
        AgentStatus::Done,
        AgentStatus::Error,
    ] {
        line(format!(
            "  {:8} {:>3}",
            status.to_string(),
            snapshot.count_status(status)
        ));
    }
    line("  --------".to_string());
    line(format!("  {:8} {:>3}", "Total", snapshot.agents.len()));
    line(String::new());

    if snapshot.skipped > 0 {
        line(format!("({} unreadable telemetry lines skipped)", snapshot.skipped));
        line(String::new());
    }

    let mut squads: Vec<&SquadRow> = snapshot.squads.iter().collect();
    squads.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if squads.is_empty() {
        line("No squads recorded yet. Start one with `squad run` or `squad serve`.".to_string());
        line(String::new());
        return out;
    }

    let shown = squads.len().min(args.limit);
    line(format!("Squads ({}):", squads.len()));
    for squad in squads.iter().take(shown) {
        line(format!(
            "  {}  {}  started {} ago  [{}]",
            short_id(&squad.squad_id),
            truncate(&squad.label, 40),
            format_age(now, squad.created_at),
            truncate(&squad.originator_id, 40)
        ));
        let mut agents: Vec<&AgentRow> = snapshot.agents_for(&squad.squad_id).collect();
        agents.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        for agent in agents {
            line(format!("    {}", agent_line(agent, now)));
        }
    }
    if squads.len() > shown {
        line(format!("  ... and {} more", squads.len() - shown));
    }
    line(String::new());

    out
}

fn agent_line(agent: &AgentRow, now: DateTime<Utc>) -> String {
    let marker = match agent.status {
        AgentStatus::Starting | AgentStatus::Running => "-",
        AgentStatus::Done => "+",
        AgentStatus::Error => "!",
    };
    let timing = match agent.finished_at {
        Some(finished) => format!("took {}", format_age(finished, agent.started_at)),
        None => format!("for {}", format_age(now, agent.started_at)),
    };
    let mut text = format!(
        "{} {:8} {}  {}",
        marker,
        agent.status.to_string(),
        truncate(&agent.role_name, 30),
        timing
    );
    if let Some(task) = &agent.task {
        text.push_str("  ");
        text.push_str(&truncate(task.lines().next().unwrap_or(""), 60));
    }
    if let Some(error) = &agent.error {
        text.push_str("  error: ");
        text.push_str(&truncate(error.lines().next().unwrap_or(""), 60));
    }
    text
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_age(now: DateTime<Utc>, ts: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(ts);
    if age.num_days() > 0 {
        format!("{}d{}h", age.num_days(), age.num_hours() % 24)
    } else if age.num_hours() > 0 {
        format!("{}h{}m", age.num_hours(), age.num_minutes() % 60)
    } else if age.num_minutes() > 0 {
        format!("{}m{}s", age.num_minutes(), age.num_seconds() % 60)
    } else {
        format!("{}s", age.num_seconds().max(0))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let take = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(take).collect();
    truncated.push_str("...");
    truncated
}

fn clear_screen() {
    print!("\x1b[2J\x1b[H");
    let _ = io::stdout().flush();
}
