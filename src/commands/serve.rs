//! Implementation of the `squad serve` command.

use super::wire;
use squad::config::ExecutionConfig;
use squad::error::Result;
use squad::protocol::{Handler, serve_stdio};
use std::sync::Arc;

pub async fn cmd_serve(config: Arc<ExecutionConfig>) -> Result<()> {
    let wiring = wire(config);
    tracing::info!(
        workspace = %wiring.orchestrator.config().workspace_root.display(),
        "squad server ready"
    );
    serve_stdio(Handler::new(wiring.orchestrator), wiring.registry).await
}
