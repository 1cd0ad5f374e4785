// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task runtime: submit, observe, cancel and await orchestrated tasks.
//!
//! Each task runs on its own tokio task; at most `max_concurrent_tasks`
//! drive the loop at once; the rest wait for a permit in the PLAN phase.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kiln_core::{CapturedOutput, KilnError};
use kiln_skill::SkillLoader;
use serde::Serialize;
use tokio::sync::{Semaphore, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::orchestrator::Orchestrator;
use crate::state::{Attempt, LoopPhase, LoopState, Observation};

/// Point-in-time view of a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub skill_id: String,
    pub state: LoopPhase,
    pub attempt_count: u32,
    pub last_error: Option<String>,
    /// Entry file of the most recent artifact.
    pub artifact_path: Option<PathBuf>,
    /// Output captured by the most recent verification.
    pub output: Option<CapturedOutput>,
    pub history: Vec<Attempt>,
    pub observations: Vec<Observation>,
    pub submitted_at: DateTime<Utc>,
}

impl TaskStatus {
    fn from_state(task: &TaskEntry, state: &LoopState) -> Self {
        Self {
            task_id: task.task_id.clone(),
            skill_id: task.skill_id.clone(),
            state: state.phase,
            attempt_count: state.attempt_count,
            last_error: state.last_error.clone(),
            artifact_path: state.artifact.as_ref().map(|a| a.entry.clone()),
            output: state.last_result.as_ref().map(|r| r.output.clone()),
            history: state.history.clone(),
            observations: state.observations.clone(),
            submitted_at: task.submitted_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

struct TaskEntry {
    task_id: String,
    skill_id: String,
    submitted_at: DateTime<Utc>,
    status: watch::Receiver<LoopState>,
    cancel: CancellationToken,
}

/// Owns every task submitted in this process.
pub struct TaskRuntime {
    orchestrator: Arc<Orchestrator>,
    skills: Arc<SkillLoader>,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
    tasks: DashMap<String, Arc<TaskEntry>>,
}

impl TaskRuntime {
    /// Creates a runtime whose tasks are all cancelled when `shutdown` fires.
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        skills: Arc<SkillLoader>,
        max_concurrent_tasks: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            skills,
            permits: Arc::new(Semaphore::new(max_concurrent_tasks.max(1))),
            shutdown,
            tasks: DashMap::new(),
        }
    }

    pub fn skills(&self) -> &Arc<SkillLoader> {
        &self.skills
    }

    /// Starts a task and returns its id.
    ///
    /// The skill is loaded before anything is spawned, so an unknown skill
    /// fails here rather than inside the task.
    pub async fn submit_task(
        &self,
        skill_id: &str,
        user_request: &str,
    ) -> Result<String, KilnError> {
        let skill = self.skills.load(skill_id).await?;
        let task_id = format!("task-{}", uuid::Uuid::new_v4().simple());
        let (status_tx, status_rx) =
            watch::channel(LoopState::new(self.orchestrator.max_retries()));
        let entry = Arc::new(TaskEntry {
            task_id: task_id.clone(),
            skill_id: skill.id.clone(),
            submitted_at: Utc::now(),
            status: status_rx,
            cancel: self.shutdown.child_token(),
        });
        self.tasks.insert(task_id.clone(), Arc::clone(&entry));

        let orchestrator = Arc::clone(&self.orchestrator);
        let permits = Arc::clone(&self.permits);
        let request = user_request.to_string();
        tokio::spawn(async move {
            let cancel = &entry.cancel;
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        let closed = KilnError::Internal("task runtime closed".into());
                        fail_unstarted(&status_tx, closed);
                        return;
                    }
                },
                _ = cancel.cancelled() => {
                    fail_unstarted(&status_tx, KilnError::Cancelled);
                    return;
                }
            };
            debug!(task_id = %entry.task_id, "task acquired a slot");
            orchestrator
                .run_with_status(&entry.task_id, &request, &skill, cancel, &status_tx)
                .await;
        });

        info!(task_id = %task_id, skill_id, "task submitted");
        Ok(task_id)
    }

    /// Current status, or `None` for an unknown id.
    pub fn get_task_status(&self, task_id: &str) -> Option<TaskStatus> {
        let entry = self.tasks.get(task_id)?;
        let state = entry.status.borrow();
        Some(TaskStatus::from_state(&entry, &state))
    }

    /// Requests cancellation. Returns false for unknown or finished tasks.
    pub fn cancel_task(&self, task_id: &str) -> bool {
        let Some(entry) = self.tasks.get(task_id) else {
            return false;
        };
        if entry.status.borrow().phase.is_terminal() {
            return false;
        }
        entry.cancel.cancel();
        info!(task_id, "task cancellation requested");
        true
    }

    /// Waits until the task reaches DONE or FAILED.
    pub async fn wait(&self, task_id: &str) -> Result<TaskStatus, KilnError> {
        let entry = self
            .tasks
            .get(task_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| KilnError::Internal(format!("unknown task {task_id}")))?;
        let mut rx = entry.status.clone();
        let state = rx
            .wait_for(|state| state.phase.is_terminal())
            .await
            .map_err(|_| KilnError::Internal(format!("task {task_id} stopped without a verdict")))?
            .clone();
        Ok(TaskStatus::from_state(&entry, &state))
    }

    /// Drops a finished task from the table and returns its final status.
    /// Unknown and still-running tasks are left alone and yield `None`.
    pub fn forget(&self, task_id: &str) -> Option<TaskStatus> {
        let (_, entry) = self
            .tasks
            .remove_if(task_id, |_, entry| entry.status.borrow().phase.is_terminal())?;
        let state = entry.status.borrow().clone();
        debug!(task_id, phase = %state.phase, "task forgotten");
        Some(TaskStatus::from_state(&entry, &state))
    }

    /// Ids of every task known to this runtime, sorted.
    pub fn task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

fn fail_unstarted(status: &watch::Sender<LoopState>, error: KilnError) {
    status.send_modify(|state| state.fail(&error));
}
