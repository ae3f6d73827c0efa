//! Batch execution.

use super::policy::{resolve_concurrency, resolve_working_directory};
use super::types::{
    MemberRequest, MemberResult, MemberStatus, SquadRequest, SquadResponse, member_id,
};
use crate::config::{ConcurrencyMode, ExecutionConfig, StateMode};
use crate::error::{Result, SquadError};
use crate::process::{ProcessOutcome, ProcessRunner};
use crate::prompt;
use crate::roles::{RoleDefinition, RoleProvider};
use crate::telemetry::{AgentPatch, AgentStatus, NewAgent, SessionInfo, TelemetrySink};
use crate::template;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Runs batches of members against the configured agent CLI.
///
/// Cheap to clone; parallel members each run on a clone.
#[derive(Clone)]
pub struct SquadOrchestrator {
    config: Arc<ExecutionConfig>,
    roles: Arc<dyn RoleProvider>,
    runner: ProcessRunner,
    telemetry: Arc<dyn TelemetrySink>,
}

/// Everything one member pipeline needs, owned so it can move into a task.
struct MemberJob {
    index: usize,
    member_id: String,
    squad_id: String,
    originator_id: String,
    state_mode: StateMode,
    role: RoleDefinition,
    request: MemberRequest,
}

/// An agent row that telemetry accepted.
struct AgentRef {
    originator_id: String,
    agent_id: String,
}

impl SquadOrchestrator {
    pub fn new(
        config: Arc<ExecutionConfig>,
        roles: Arc<dyn RoleProvider>,
        runner: ProcessRunner,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            config,
            roles,
            runner,
            telemetry,
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn roles(&self) -> &dyn RoleProvider {
        self.roles.as_ref()
    }

    /// Run a batch in the configured state mode.
    pub async fn start(&self, request: SquadRequest) -> Result<SquadResponse> {
        match self.config.state_mode {
            StateMode::Stateless => self.start_stateless(request).await,
            StateMode::Stateful => self.start_stateful(request).await,
        }
    }

    /// Run a batch where every member is a fresh agent process.
    pub async fn start_stateless(&self, request: SquadRequest) -> Result<SquadResponse> {
        self.run_batch(request, StateMode::Stateless).await
    }

    /// Run a batch where members create or resume a conversation.
    pub async fn start_stateful(&self, request: SquadRequest) -> Result<SquadResponse> {
        self.run_batch(request, StateMode::Stateful).await
    }

    async fn run_batch(&self, request: SquadRequest, state_mode: StateMode) -> Result<SquadResponse> {
        // Nothing is spawned unless every role exists.
        let roles = self.resolve_roles(&request.members).await?;

        let squad_id = Uuid::new_v4().to_string();
        let originator_id = self.open_squad(&squad_id, &request).await;
        let concurrency = resolve_concurrency(&self.config);

        tracing::info!(
            squad_id = %squad_id,
            members = request.members.len(),
            concurrency = %concurrency,
            state_mode = state_mode.as_str(),
            "starting squad"
        );

        let jobs: Vec<MemberJob> = request
            .members
            .into_iter()
            .zip(roles)
            .enumerate()
            .map(|(index, (member, role))| MemberJob {
                index,
                member_id: member_id(&squad_id, index),
                squad_id: squad_id.clone(),
                originator_id: originator_id.clone(),
                state_mode,
                role,
                request: member,
            })
            .collect();

        let members = match concurrency {
            ConcurrencyMode::Sequential => self.run_sequential(jobs).await?,
            ConcurrencyMode::Parallel => self.run_parallel(jobs).await?,
        };

        tracing::info!(squad_id = %squad_id, "squad finished");
        Ok(SquadResponse { squad_id, members })
    }

    async fn resolve_roles(&self, members: &[MemberRequest]) -> Result<Vec<RoleDefinition>> {
        let mut roles = Vec::with_capacity(members.len());
        for member in members {
            let role = self
                .roles
                .get_role(&member.role_id)
                .await?
                .ok_or_else(|| SquadError::RoleNotFound(member.role_id.clone()))?;
            roles.push(role);
        }
        Ok(roles)
    }

    async fn run_sequential(&self, jobs: Vec<MemberJob>) -> Result<Vec<MemberResult>> {
        let total = jobs.len();
        let mut results = Vec::with_capacity(total);
        for job in jobs {
            let index = job.index;
            results.push(self.run_member(job).await?);
            if index + 1 < total && !self.config.sequential_delay.is_zero() {
                tokio::time::sleep(self.config.sequential_delay).await;
            }
        }
        Ok(results)
    }

    async fn run_parallel(&self, jobs: Vec<MemberJob>) -> Result<Vec<MemberResult>> {
        let mut slots: Vec<Option<MemberResult>> = vec![None; jobs.len()];

        let mut pending: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|job| {
                let index = job.index;
                let orchestrator = self.clone();
                let handle = tokio::spawn(async move { orchestrator.run_member(job).await });
                async move { (index, handle.await) }
            })
            .collect();

        // Returning early detaches the remaining tasks; they run to completion.
        while let Some((index, joined)) = pending.next().await {
            let result = joined.map_err(|e| {
                SquadError::UserError(format!("member task {} failed: {}", index, e))
            })??;
            slots[index] = Some(result);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    async fn run_member(&self, job: MemberJob) -> Result<MemberResult> {
        let supplied_handle = job.request.handle().map(str::to_string);
        let prompt = match (job.state_mode, &supplied_handle) {
            (StateMode::Stateless, _) => prompt::build_stateless(&job.role, &job.request.task),
            (StateMode::Stateful, None) => {
                prompt::build_new_conversation(&job.role, &job.request.task)
            }
            (StateMode::Stateful, Some(_)) => prompt::build_continuing(&job.request.task),
        };

        let agent = self.create_agent(&job, &prompt).await;
        let result = self
            .execute_member(&job, &prompt, supplied_handle, agent.as_ref())
            .await;

        let patch = match &result {
            Ok(result) => match result.status {
                MemberStatus::Completed => AgentPatch::done(result.raw_stdout.clone()),
                MemberStatus::Error => AgentPatch::failed(failure_summary(result)),
                MemberStatus::Timeout => AgentPatch::failed(format!(
                    "timed out after {}ms",
                    self.config.process_timeout.as_millis()
                )),
            },
            Err(e) => AgentPatch::failed(e.to_string()),
        };
        self.update_agent(agent.as_ref(), patch).await;

        match &result {
            Ok(result) => tracing::info!(
                member_id = %result.member_id,
                role_id = %result.role_id,
                status = %result.status,
                "member finished"
            ),
            Err(e) => tracing::warn!(
                member_id = %job.member_id,
                role_id = %job.request.role_id,
                error = %e,
                "member failed"
            ),
        }
        result
    }

    async fn execute_member(
        &self,
        job: &MemberJob,
        prompt: &str,
        supplied_handle: Option<String>,
        agent: Option<&AgentRef>,
    ) -> Result<MemberResult> {
        let working_directory =
            resolve_working_directory(&self.config.workspace_root, job.request.cwd.as_deref());
        let mut context = member_context(
            &prompt::escape_for_double_quotes(prompt),
            &working_directory,
            &job.role.id,
            &job.request.task,
        );

        let handle = match job.state_mode {
            StateMode::Stateless => None,
            StateMode::Stateful => Some(match supplied_handle {
                Some(handle) => handle,
                None => self.mint_handle(&context, &working_directory).await?,
            }),
        };
        if let Some(handle) = &handle {
            context.insert(template::CONVERSATION_HANDLE.to_string(), handle.clone());
            context.insert(template::CONVERSATION_HANDLE_ALIAS.to_string(), handle.clone());
        }

        let command = self
            .render_command(&self.config.run_template_path, "template", &context)
            .await?;

        self.update_agent(agent, AgentPatch::status(AgentStatus::Running))
            .await;
        let outcome = self
            .runner
            .run(
                &command,
                &working_directory,
                self.config.process_timeout,
            )
            .await;

        Ok(MemberResult {
            member_id: job.member_id.clone(),
            role_id: job.request.role_id.clone(),
            cwd: job.request.cwd.clone(),
            status: MemberStatus::from_outcome(&outcome),
            raw_stdout: outcome.stdout,
            raw_stderr: outcome.stderr,
            chat_id: handle,
        })
    }

    /// Run the create-chat template and return the handle it prints.
    async fn mint_handle(
        &self,
        context: &HashMap<String, String>,
        working_directory: &Path,
    ) -> Result<String> {
        let path = self.create_chat_template_path();

        let token = Uuid::new_v4().to_string();
        let mut context = context.clone();
        context.insert(template::GENERATED_TOKEN.to_string(), token.clone());
        context.insert(template::GENERATED_TOKEN_ALIAS.to_string(), token);

        let command = self
            .render_command(&path, "create-chat template", &context)
            .await?;
        let outcome = self
            .runner
            .run(
                &command,
                working_directory,
                self.config.process_timeout,
            )
            .await;

        if !outcome.is_success() {
            return Err(SquadError::CreateHandleFailed(self.create_failure_detail(
                &outcome,
            )));
        }

        let handle = outcome.stdout.trim();
        if handle.is_empty() {
            return Err(SquadError::HandleExtractionFailed(path));
        }
        tracing::debug!(handle, "created conversation");
        Ok(handle.to_string())
    }

    fn create_chat_template_path(&self) -> PathBuf {
        self.config.create_chat_template_path.clone().unwrap_or_else(|| {
            self.config
                .workspace_root
                .join(self.config.engine.default_create_chat_template())
        })
    }

    fn create_failure_detail(&self, outcome: &ProcessOutcome) -> String {
        let stderr = outcome.stderr.trim();
        let stdout = outcome.stdout.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else if outcome.timed_out {
            format!(
                "timed out after {}ms",
                self.config.process_timeout.as_millis()
            )
        } else {
            exit_description(outcome)
        }
    }

    /// Read a template fresh from disk and render it into a command line.
    ///
    /// The rendered text runs as written, so quoting in the template and the
    /// prompt's own escaping reach the shell intact. Splitting only detects
    /// empty renderings.
    async fn render_command(
        &self,
        path: &Path,
        kind: &'static str,
        context: &HashMap<String, String>,
    ) -> Result<String> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            SquadError::UserError(format!("failed to read {} '{}': {}", kind, path.display(), e))
        })?;

        let rendered =
            template::render_template(&text, context).map_err(|source| SquadError::Render {
                kind,
                path: path.to_path_buf(),
                source,
            })?;
        let args = template::split_args(&rendered);
        if args.is_empty() {
            return Err(SquadError::EmptyCommand(path.to_path_buf()));
        }
        tracing::debug!(kind, program = %args[0], args = args.len(), "rendered command");
        Ok(rendered.trim().to_string())
    }

    /// Session and squad rows. Returns the originator id either way.
    async fn open_squad(&self, squad_id: &str, request: &SquadRequest) -> String {
        let session = SessionInfo::resolve(
            non_empty(&request.orchestrator_chat_id),
            non_empty(&request.workspace_id),
            &self.config.workspace_root.to_string_lossy(),
        );

        let originator_id = match self.telemetry.ensure_session(&session).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "telemetry: failed to record session");
                session.originator_id.clone()
            }
        };

        let label = request
            .members
            .iter()
            .map(|member| member.role_id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        if let Err(e) = self
            .telemetry
            .create_squad(squad_id, &originator_id, &label)
            .await
        {
            tracing::warn!(squad_id, error = %e, "telemetry: failed to record squad");
        }

        originator_id
    }

    async fn create_agent(&self, job: &MemberJob, prompt: &str) -> Option<AgentRef> {
        let agent = NewAgent {
            squad_id: job.squad_id.clone(),
            role_name: job.role.name.clone(),
            task: Some(job.request.task.clone()),
            prompt: Some(prompt.to_string()),
        };
        match self.telemetry.create_agent(&agent).await {
            Ok(agent_id) => Some(AgentRef {
                originator_id: job.originator_id.clone(),
                agent_id,
            }),
            Err(e) => {
                tracing::warn!(member_id = %job.member_id, error = %e, "telemetry: failed to record agent");
                None
            }
        }
    }

    async fn update_agent(&self, agent: Option<&AgentRef>, patch: AgentPatch) {
        let Some(agent) = agent else {
            return;
        };
        if let Err(e) = self
            .telemetry
            .update_agent(&agent.originator_id, &agent.agent_id, patch)
            .await
        {
            tracing::warn!(agent_id = %agent.agent_id, error = %e, "telemetry: failed to update agent");
        }
    }
}

/// Template variables shared by the run and create-chat templates.
fn member_context(
    escaped_prompt: &str,
    working_directory: &Path,
    role_id: &str,
    task: &str,
) -> HashMap<String, String> {
    let working_directory = working_directory.to_string_lossy();
    template::vars([
        (template::PROMPT, escaped_prompt),
        (template::WORKING_DIRECTORY, working_directory.as_ref()),
        (template::WORKING_DIRECTORY_ALIAS, working_directory.as_ref()),
        (template::ROLE_ID, role_id),
        (template::TASK, task),
    ])
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn exit_description(outcome: &ProcessOutcome) -> String {
    match outcome.exit_code {
        Some(code) => format!("exited with code {}", code),
        None => "terminated without an exit code".to_string(),
    }
}

fn failure_summary(result: &MemberResult) -> String {
    let stderr = result.raw_stderr.trim();
    if stderr.is_empty() {
        "agent exited unsuccessfully".to_string()
    } else {
        stderr.to_string()
    }
}
