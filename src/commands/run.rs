//! Implementation of the `squad run` command.

use super::wire;
use crate::cli::RunArgs;
use squad::config::ExecutionConfig;
use squad::error::{Result, SquadError};
use squad::squad::SquadRequest;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

pub async fn cmd_run(config: Arc<ExecutionConfig>, args: RunArgs) -> Result<()> {
    let text = read_request(&args.request).await?;
    let request: SquadRequest = serde_json::from_str(&text).map_err(|e| {
        SquadError::UserError(format!("invalid squad request '{}': {}", args.request, e))
    })?;

    let wiring = wire(config);
    let outcome = tokio::select! {
        outcome = wiring.orchestrator.start(request) => outcome,
        _ = tokio::signal::ctrl_c() => {
            let killed = wiring.registry.kill_all();
            tracing::warn!(killed, "interrupted, killed running agents");
            return Err(SquadError::UserError("interrupted".to_string()));
        }
    };
    let response = outcome?;

    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| SquadError::UserError(format!("failed to encode squad result: {}", e)))?;
    println!("{}", json);
    Ok(())
}

async fn read_request(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .map_err(|e| SquadError::UserError(format!("failed to read request from stdin: {}", e)))?;
        return Ok(text);
    }

    tokio::fs::read_to_string(source)
        .await
        .map_err(|e| SquadError::UserError(format!("failed to read request file '{}': {}", source, e)))
}
