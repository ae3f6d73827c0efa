use super::*;
use tempfile::TempDir;

fn session(originator: &str) -> SessionInfo {
    SessionInfo {
        originator_id: originator.to_string(),
        orchestrator_chat_id: Some(originator.to_string()),
        workspace_id: None,
    }
}

fn new_agent(squad_id: &str, role: &str) -> NewAgent {
    NewAgent {
        squad_id: squad_id.to_string(),
        role_name: role.to_string(),
        task: Some("do the thing".to_string()),
        prompt: None,
    }
}

#[test]
fn test_session_originator_precedence() {
    let info = SessionInfo::resolve(Some("chat".into()), Some("ws".into()), "/root");
    assert_eq!(info.originator_id, "chat");
    assert_eq!(info.workspace_id.as_deref(), Some("ws"));

    let info = SessionInfo::resolve(None, Some("ws".into()), "/root");
    assert_eq!(info.originator_id, "ws");

    let info = SessionInfo::resolve(None, None, "/root");
    assert_eq!(info.originator_id, "/root");
    assert_eq!(info.workspace_id.as_deref(), Some("/root"));
}

#[test]
fn test_event_line_is_tagged_and_camel_case() {
    let event = TelemetryEvent::new(Record::Squad(SquadCreated {
        squad_id: "s1".to_string(),
        originator_id: "o1".to_string(),
        label: "qa,frontend".to_string(),
    }));
    let line = event.to_ndjson_line().unwrap();

    assert!(!line.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["kind"], "squad");
    assert_eq!(value["squadId"], "s1");
    assert_eq!(value["originatorId"], "o1");
    assert!(value["actor"].as_str().unwrap().contains('@'));

    let parsed: TelemetryEvent = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed.record, event.record);
}

#[test]
fn test_agent_patch_constructors() {
    let done = AgentPatch::done("output");
    assert_eq!(done.status, Some(AgentStatus::Done));
    assert_eq!(done.result.as_deref(), Some("output"));
    assert!(done.finished_at.is_some());

    let failed = AgentPatch::failed("boom");
    assert_eq!(failed.status, Some(AgentStatus::Error));
    assert_eq!(failed.error.as_deref(), Some("boom"));

    let running = AgentPatch::status(AgentStatus::Running);
    assert!(running.finished_at.is_none());
}

#[tokio::test]
async fn test_ndjson_sink_round_trips_through_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("telemetry.ndjson");
    let sink = NdjsonTelemetry::new(&path);

    let originator = sink.ensure_session(&session("chat-1")).await.unwrap();
    assert_eq!(originator, "chat-1");
    sink.create_squad("squad-1", &originator, "qa,frontend")
        .await
        .unwrap();
    let qa = sink.create_agent(&new_agent("squad-1", "qa")).await.unwrap();
    let fe = sink
        .create_agent(&new_agent("squad-1", "frontend"))
        .await
        .unwrap();
    sink.update_agent(&originator, &qa, AgentPatch::status(AgentStatus::Running))
        .await
        .unwrap();
    sink.update_agent(&originator, &qa, AgentPatch::done("all good"))
        .await
        .unwrap();
    sink.update_agent(&originator, &fe, AgentPatch::failed("exit 1"))
        .await
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 7);

    let snapshot = TelemetrySnapshot::load(&path).unwrap();
    assert_eq!(snapshot.skipped, 0);
    assert_eq!(snapshot.sessions.len(), 1);
    assert_eq!(snapshot.squads.len(), 1);
    assert_eq!(snapshot.squads[0].label, "qa,frontend");

    let agents: Vec<&AgentRow> = snapshot.agents_for("squad-1").collect();
    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0].role_name, "qa");
    assert_eq!(agents[0].status, AgentStatus::Done);
    assert_eq!(agents[0].result.as_deref(), Some("all good"));
    assert!(agents[0].finished_at.is_some());
    assert_eq!(agents[1].status, AgentStatus::Error);
    assert_eq!(agents[1].error.as_deref(), Some("exit 1"));
    assert_eq!(snapshot.count_status(AgentStatus::Done), 1);
}

#[tokio::test]
async fn test_concurrent_writes_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("telemetry.ndjson");
    let sink = std::sync::Arc::new(NdjsonTelemetry::new(&path));

    let mut handles = Vec::new();
    for i in 0..20 {
        let sink = sink.clone();
        handles.push(tokio::spawn(async move {
            sink.create_agent(&new_agent("squad", &format!("role-{}", i)))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = TelemetrySnapshot::load(&path).unwrap();
    assert_eq!(snapshot.agents.len(), 20);
    assert_eq!(snapshot.skipped, 0);
}

#[test]
fn test_snapshot_repeated_session_keeps_creation_time() {
    let first = TelemetryEvent::new(Record::Session(SessionInfo {
        originator_id: "o".to_string(),
        orchestrator_chat_id: None,
        workspace_id: None,
    }));
    let mut second = TelemetryEvent::new(Record::Session(SessionInfo {
        originator_id: "o".to_string(),
        orchestrator_chat_id: Some("chat".to_string()),
        workspace_id: Some("ws".to_string()),
    }));
    second.ts = first.ts + chrono::Duration::seconds(30);

    let mut snapshot = TelemetrySnapshot::default();
    snapshot.apply(first.clone());
    snapshot.apply(second.clone());

    assert_eq!(snapshot.sessions.len(), 1);
    let row = &snapshot.sessions[0];
    assert_eq!(row.created_at, first.ts);
    assert_eq!(row.last_activity_at, second.ts);
    assert_eq!(row.orchestrator_chat_id.as_deref(), Some("chat"));
    assert_eq!(snapshot.last_activity(), Some(second.ts));
}

#[test]
fn test_snapshot_skips_garbage_lines() {
    let snapshot = TelemetrySnapshot::from_ndjson("not json\n\n{\"kind\":\"unknown\"}\n");
    assert_eq!(snapshot.skipped, 2);
    assert!(snapshot.sessions.is_empty());
}

#[test]
fn test_snapshot_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let snapshot = TelemetrySnapshot::load(&dir.path().join("absent.ndjson")).unwrap();
    assert!(snapshot.agents.is_empty());
    assert_eq!(snapshot.last_activity(), None);
}

#[tokio::test]
async fn test_noop_sink() {
    let sink = NoopTelemetry;
    assert_eq!(sink.ensure_session(&session("x")).await.unwrap(), "x");
    assert!(!sink.create_agent(&new_agent("s", "r")).await.unwrap().is_empty());
}
