// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plan-generate-verify-fix loop for a single task.
//!
//! One orchestrator call drives one task strictly sequentially. Every
//! GENERATE is followed by a VERIFY of that same artifact, and the loop
//! fails after exactly `max_retries` FIX transitions.

use std::sync::Arc;

use kiln_core::{CodeArtifact, CodeRequest, ExecutionRequest, KilnError};
use kiln_sandbox::{Sandbox, TaskWorkspace};
use kiln_skill::SkillDefinition;
use kiln_tool::{ToolRegistry, validate_map};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::planner::{Plan, PlanningPolicy};
use crate::state::{Attempt, LoopPhase, LoopState, Observation};

/// Final state of a task plus the error that ended it, if any.
#[derive(Debug)]
pub struct TaskOutcome {
    pub state: LoopState,
    pub error: Option<KilnError>,
}

impl TaskOutcome {
    /// The successful artifact, or the error that ended the loop.
    pub fn into_result(self) -> Result<CodeArtifact, KilnError> {
        match (self.error, self.state.artifact) {
            (Some(err), _) => Err(err),
            (None, Some(artifact)) if self.state.phase == LoopPhase::Done => Ok(artifact),
            (None, _) => Err(KilnError::Internal(format!(
                "task ended in {} without an artifact",
                self.state.phase
            ))),
        }
    }
}

/// Drives tasks through the self-correction loop.
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    sandbox: Arc<Sandbox>,
    planner: Arc<dyn PlanningPolicy>,
    max_retries: u32,
}

/// Per-run data the phases share.
struct Run<'a> {
    task_id: &'a str,
    skill: &'a SkillDefinition,
    cancel: &'a CancellationToken,
    status: &'a watch::Sender<LoopState>,
    state: LoopState,
}

impl Run<'_> {
    fn publish(&self) {
        self.status.send_replace(self.state.clone());
    }

    fn advance(&mut self, next: LoopPhase) -> Result<(), KilnError> {
        let from = self.state.phase;
        self.state.transition(next)?;
        info!(
            task_id = self.task_id,
            from = %from,
            to = %next,
            attempt = self.state.attempt_count,
            "loop transition"
        );
        self.publish();
        Ok(())
    }

    fn finish(mut self, error: Option<KilnError>) -> TaskOutcome {
        if let Some(err) = &error {
            self.state.fail(err);
            error!(
                task_id = self.task_id,
                attempts = self.state.history.len(),
                error = %err,
                "task failed"
            );
        } else {
            info!(
                task_id = self.task_id,
                attempts = self.state.attempt_count,
                "task done"
            );
        }
        self.publish();
        TaskOutcome {
            state: self.state,
            error,
        }
    }
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ToolRegistry>,
        sandbox: Arc<Sandbox>,
        planner: Arc<dyn PlanningPolicy>,
        max_retries: u32,
    ) -> Self {
        Self {
            registry,
            sandbox,
            planner,
            max_retries,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Runs a task to a terminal phase.
    pub async fn run(
        &self,
        task_id: &str,
        request: &str,
        skill: &SkillDefinition,
        cancel: &CancellationToken,
    ) -> TaskOutcome {
        let (status, _) = watch::channel(LoopState::new(self.max_retries));
        self.run_with_status(task_id, request, skill, cancel, &status)
            .await
    }

    /// Like [`Orchestrator::run`], publishing every state change to `status`.
    pub async fn run_with_status(
        &self,
        task_id: &str,
        request: &str,
        skill: &SkillDefinition,
        cancel: &CancellationToken,
        status: &watch::Sender<LoopState>,
    ) -> TaskOutcome {
        let mut run = Run {
            task_id,
            skill,
            cancel,
            status,
            state: LoopState::new(self.max_retries),
        };
        run.publish();
        info!(task_id, skill_id = %skill.id, max_retries = self.max_retries, "task started");

        match self.drive(&mut run, request).await {
            Ok(()) => run.finish(None),
            Err(err) => run.finish(Some(err)),
        }
    }

    async fn drive(&self, run: &mut Run<'_>, request: &str) -> Result<(), KilnError> {
        let workspace = self.sandbox.workspace(run.task_id)?;

        // PLAN
        let plan = tokio::select! {
            plan = self.planner.plan(request, run.skill, &self.registry) => plan?,
            _ = run.cancel.cancelled() => return Err(KilnError::Cancelled),
        };
        let Plan {
            mut code_request,
            tool_calls,
            run_args,
        } = plan;
        for call in tool_calls {
            let observation = self.dispatch(run, call).await?;
            code_request.context.push(observation.summary());
            run.state.observations.push(observation);
            run.publish();
        }
        run.advance(LoopPhase::Generate)?;

        loop {
            // GENERATE
            let version = run.state.attempt_count + 1;
            let artifact = self
                .generate(&workspace, version, &code_request, run.cancel)
                .await?;
            run.state.artifact = Some(artifact.clone());
            run.advance(LoopPhase::Verify)?;

            // VERIFY
            let result = self
                .sandbox
                .run_cancellable(&artifact, &run_args, self.sandbox.step_timeout(), run.cancel)
                .await?;
            run.state.last_result = Some(result.clone());
            if result.is_success() {
                run.state.last_error = None;
                run.advance(LoopPhase::Done)?;
                return Ok(());
            }

            warn!(
                task_id = run.task_id,
                version,
                status = %result.status,
                "verification failed"
            );
            run.state.last_error = Some(result.message.clone());
            run.state.history.push(Attempt {
                artifact: artifact.clone(),
                status: result.status,
                error: result.message.clone(),
            });

            if !run.state.can_retry() {
                return Err(KilnError::LoopExhausted {
                    attempts: run.state.history.len() as u32,
                    last_error: result.message,
                });
            }

            // FIX
            run.advance(LoopPhase::Fix)?;
            code_request = code_request.repair(&artifact, result.message, run.state.attempt_count);
            run.advance(LoopPhase::Generate)?;
        }
    }

    async fn generate(
        &self,
        workspace: &TaskWorkspace,
        version: u32,
        request: &CodeRequest,
        cancel: &CancellationToken,
    ) -> Result<CodeArtifact, KilnError> {
        let artifact = self
            .sandbox
            .generate(workspace, version, request, cancel)
            .await?;
        if !artifact.warnings.is_empty() {
            debug!(
                task_id = workspace.task_id(),
                version,
                warnings = artifact.warnings.len(),
                "artifact has format warnings"
            );
        }
        Ok(artifact)
    }

    /// Resolves, validates and executes one planned tool call.
    ///
    /// Registry and validation failures only reject this call; the only
    /// error returned is cancellation.
    async fn dispatch(
        &self,
        run: &Run<'_>,
        call: ExecutionRequest,
    ) -> Result<Observation, KilnError> {
        let rejected = |message: String| Observation {
            call_id: call.call_id.clone(),
            tool: call.tool.clone(),
            status: None,
            message,
        };

        if run.skill.is_unresolved(&call.tool) {
            warn!(task_id = run.task_id, tool = %call.tool, "call to unresolved skill binding");
            return Ok(rejected(format!(
                "unresolved binding: skill `{}` binds `{}` but no such tool is registered",
                run.skill.id, call.tool
            )));
        }
        let spec = match self.registry.resolve(&call.tool) {
            Ok(spec) => spec,
            Err(err) => {
                warn!(task_id = run.task_id, tool = %call.tool, error = %err, "tool call rejected");
                return Ok(rejected(err.to_string()));
            }
        };
        let args = match validate_map(&spec, &call.args) {
            Ok(args) => args,
            Err(err) => {
                warn!(task_id = run.task_id, tool = %call.tool, error = %err, "tool call rejected");
                return Ok(rejected(err.to_string()));
            }
        };

        let result = tokio::select! {
            result = self.sandbox.execute(&spec, args, &call.call_id) => result,
            _ = run.cancel.cancelled() => return Err(KilnError::Cancelled),
        };
        debug!(
            task_id = run.task_id,
            tool = %call.tool,
            status = %result.status,
            "planned tool call finished"
        );
        Ok(Observation {
            call_id: call.call_id,
            tool: call.tool,
            status: Some(result.status),
            message: result.message,
        })
    }
}
