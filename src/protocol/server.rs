//! Stdio serving loop.

use super::{Handler, Response};
use crate::error::{Result, SquadError};
use crate::process::ChildRegistry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// How long in-flight requests get to write their responses after shutdown.
const SHUTDOWN_FLUSH: Duration = Duration::from_secs(3);

/// Serve requests from `input` until it closes or `shutdown` resolves.
///
/// Every request runs on its own task; responses are written whole, one per
/// line. On the way out every tracked child is killed.
pub async fn serve<R, W, S>(
    handler: Handler,
    input: R,
    output: W,
    registry: ChildRegistry,
    shutdown: S,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
    S: Future<Output = ()>,
{
    let output = Arc::new(Mutex::new(output));
    let mut lines = input.lines();
    let mut in_flight = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let handler = handler.clone();
                    let output = Arc::clone(&output);
                    in_flight.spawn(async move {
                        if let Some(response) = handler.handle_line(&line).await
                            && let Err(e) = write_response(&output, &response).await
                        {
                            tracing::warn!(error = %e, "failed to write response");
                        }
                    });
                }
                Ok(None) => {
                    tracing::info!("input closed, shutting down");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read input, shutting down");
                    break;
                }
            },
            () = &mut shutdown => {
                tracing::info!("shutdown requested");
                break;
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "request task failed");
                }
            }
        }
    }

    let killed = registry.kill_all();
    if killed > 0 {
        tracing::info!(killed, "killed running agents");
    }

    let drain = async { while in_flight.join_next().await.is_some() {} };
    if tokio::time::timeout(SHUTDOWN_FLUSH, drain).await.is_err() {
        tracing::debug!("abandoning unfinished requests");
        in_flight.shutdown().await;
    }

    Ok(())
}

/// Serve on the process's stdin and stdout until EOF, SIGINT or SIGTERM.
pub async fn serve_stdio(handler: Handler, registry: ChildRegistry) -> Result<()> {
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    serve(handler, input, tokio::io::stdout(), registry, shutdown_signal()).await
}

async fn write_response<W>(output: &Mutex<W>, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)
        .map_err(|e| SquadError::UserError(format!("failed to encode response: {}", e)))?;
    line.push(b'\n');

    let mut output = output.lock().await;
    output
        .write_all(&line)
        .await
        .map_err(|e| SquadError::UserError(format!("failed to write response: {}", e)))?;
    output
        .flush()
        .await
        .map_err(|e| SquadError::UserError(format!("failed to write response: {}", e)))
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestWorkspace;
    use std::future::pending;
    use tokio::io::{AsyncReadExt, BufReader};

    fn handler(workspace: &TestWorkspace, run: &str) -> Handler {
        workspace.write_file("run.template", run);
        let config = workspace.config(&[
            ("RUN_TEMPLATE_PATH", "run.template"),
            ("EXECUTION_MODE", "parallel"),
        ]);
        Handler::new(workspace.orchestrator(config))
    }

    async fn responses(mut reader: tokio::io::DuplexStream) -> Vec<Response> {
        let mut text = String::new();
        reader.read_to_string(&mut text).await.unwrap();
        text.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_serves_until_eof() {
        let workspace = TestWorkspace::new();
        let input = b"{\"method\":\"list_roles\",\"id\":1}\n\n{\"method\":\"nope\",\"id\":2}\n";
        let (writer, reader) = tokio::io::duplex(64 * 1024);

        serve(
            handler(&workspace, "echo hi"),
            BufReader::new(&input[..]),
            writer,
            ChildRegistry::new(),
            pending::<()>(),
        )
        .await
        .unwrap();

        let mut responses = responses(reader).await;
        responses.sort_by_key(|r| r.id.as_ref().and_then(|id| id.as_i64()));
        assert_eq!(responses.len(), 2);
        assert!(responses[0].result.is_some());
        assert_eq!(responses[1].error.as_ref().unwrap().code, crate::protocol::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_slow_request_does_not_block_fast_one() {
        let workspace = TestWorkspace::new();
        let input = concat!(
            "{\"method\":\"start_squad_members\",\"id\":1,\"params\":{\"members\":[{\"roleId\":\"qa\",\"task\":\"x\"}]}}\n",
            "{\"method\":\"list_roles\",\"id\":2}\n",
        );
        let (writer, reader) = tokio::io::duplex(64 * 1024);

        serve(
            handler(&workspace, "sleep 0.3 && echo done"),
            BufReader::new(input.as_bytes()),
            writer,
            ChildRegistry::new(),
            pending::<()>(),
        )
        .await
        .unwrap();

        let responses = responses(reader).await;
        let order: Vec<i64> = responses
            .iter()
            .filter_map(|r| r.id.as_ref().and_then(|id| id.as_i64()))
            .collect();
        assert_eq!(order, vec![2, 1]);
    }
}
