//! Request dispatch.

use super::{INTERNAL_ERROR, METHOD_NOT_FOUND, PARSE_ERROR, Request, Response};
use crate::error::{Result, SquadError};
use crate::squad::{SquadOrchestrator, SquadRequest};
use serde_json::{Value, json};

/// Maps protocol methods onto the orchestrator.
#[derive(Clone)]
pub struct Handler {
    orchestrator: SquadOrchestrator,
}

impl Handler {
    pub fn new(orchestrator: SquadOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Handle one input line. Blank lines get no response.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<Request>(line) {
            Ok(request) => Some(self.handle(request).await),
            Err(e) => {
                tracing::warn!(error = %e, "unparsable request line");
                Some(Response::failure(None, PARSE_ERROR, e.to_string()))
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        let Request { method, params, id } = request;
        tracing::debug!(method = %method, ?id, "request");

        let outcome = match method.as_str() {
            "list_roles" => self.list_roles().await,
            "start_squad_members" => self.start_squad_members(params).await,
            _ => {
                return Response::failure(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                );
            }
        };

        match outcome {
            Ok(result) => Response::success(id, result),
            Err(e) => {
                tracing::warn!(method = %method, error = %e, "request failed");
                Response::failure(id, INTERNAL_ERROR, e.to_string())
            }
        }
    }

    async fn list_roles(&self) -> Result<Value> {
        let roles = self.orchestrator.roles().list_roles().await?;
        Ok(json!({ "roles": roles }))
    }

    async fn start_squad_members(&self, params: Option<Value>) -> Result<Value> {
        let request: SquadRequest =
            serde_json::from_value(params.unwrap_or_else(|| json!({}))).map_err(|e| {
                SquadError::UserError(format!("invalid start_squad_members params: {}", e))
            })?;

        let response = self.orchestrator.start(request).await?;
        serde_json::to_value(response)
            .map_err(|e| SquadError::UserError(format!("failed to encode squad result: {}", e)))
    }
}
