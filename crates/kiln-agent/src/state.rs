// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loop state of one task.
//!
//! Phases: PLAN -> GENERATE -> VERIFY -> (DONE | FIX -> GENERATE ...), with
//! FAILED reachable from every non-terminal phase.

use std::fmt;

use kiln_core::{CodeArtifact, ExecutionResult, ExecutionStatus, KilnError};
use serde::{Deserialize, Serialize};

/// Phases of the self-correction loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoopPhase {
    /// Asking the planning policy and dispatching planned tool calls.
    Plan,
    /// Producing the next artifact version.
    Generate,
    /// Running the current artifact.
    Verify,
    /// Folding the captured error into a repair request.
    Fix,
    /// The last verification succeeded.
    Done,
    /// Retry budget spent, unrecoverable step failure, or cancellation.
    Failed,
}

impl LoopPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoopPhase::Done | LoopPhase::Failed)
    }

    /// Whether `self -> next` is an edge of the loop.
    pub fn can_transition_to(self, next: LoopPhase) -> bool {
        use LoopPhase::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Plan, Generate) | (Generate, Verify) | (Verify, Done | Fix) | (Fix, Generate) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopPhase::Plan => write!(f, "PLAN"),
            LoopPhase::Generate => write!(f, "GENERATE"),
            LoopPhase::Verify => write!(f, "VERIFY"),
            LoopPhase::Fix => write!(f, "FIX"),
            LoopPhase::Done => write!(f, "DONE"),
            LoopPhase::Failed => write!(f, "FAILED"),
        }
    }
}

/// One failed verification: the artifact and what it printed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub artifact: CodeArtifact,
    pub status: ExecutionStatus,
    pub error: String,
}

/// Record of a tool call dispatched during PLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub call_id: String,
    pub tool: String,
    /// `None` when the call was rejected before execution.
    pub status: Option<ExecutionStatus>,
    pub message: String,
}

impl Observation {
    /// One-line form appended to the code request context.
    pub fn summary(&self) -> String {
        match self.status {
            Some(status) => format!("{} [{status}]: {}", self.tool, self.message),
            None => format!("{} [rejected]: {}", self.tool, self.message),
        }
    }
}

/// Everything known about a task at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    pub phase: LoopPhase,
    /// FIX transitions taken so far. Never exceeds `max_retries`.
    pub attempt_count: u32,
    pub max_retries: u32,
    /// Failed verifications, oldest first.
    pub history: Vec<Attempt>,
    pub observations: Vec<Observation>,
    /// Most recent artifact.
    pub artifact: Option<CodeArtifact>,
    /// Result of the most recent verification.
    pub last_result: Option<ExecutionResult>,
    /// Text of the most recent failure (verification or terminal error).
    pub last_error: Option<String>,
}

impl LoopState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            phase: LoopPhase::Plan,
            attempt_count: 0,
            max_retries,
            history: Vec::new(),
            observations: Vec::new(),
            artifact: None,
            last_result: None,
            last_error: None,
        }
    }

    /// Moves to `next`, rejecting edges the loop does not have.
    pub fn transition(&mut self, next: LoopPhase) -> Result<(), KilnError> {
        if !self.phase.can_transition_to(next) {
            return Err(KilnError::Internal(format!(
                "illegal loop transition {} -> {next}",
                self.phase
            )));
        }
        if next == LoopPhase::Fix {
            if self.attempt_count >= self.max_retries {
                return Err(KilnError::Internal(format!(
                    "retry budget of {} already spent",
                    self.max_retries
                )));
            }
            self.attempt_count += 1;
        }
        self.phase = next;
        Ok(())
    }

    /// True while another FIX transition is allowed.
    pub fn can_retry(&self) -> bool {
        self.attempt_count < self.max_retries
    }

    /// Forces FAILED and records `error`.
    ///
    /// An exhausted loop keeps the last verification error verbatim.
    pub fn fail(&mut self, error: &KilnError) {
        self.last_error = Some(match error {
            KilnError::LoopExhausted { last_error, .. } => last_error.clone(),
            other => other.to_string(),
        });
        if !self.phase.is_terminal() {
            self.phase = LoopPhase::Failed;
        }
    }
}
