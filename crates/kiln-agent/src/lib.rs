// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestration for Kiln.
//!
//! - [`state`]: loop phases and per-task state
//! - [`planner`]: the pluggable planning policy and the default skill planner
//! - [`orchestrator`]: the plan-generate-verify-fix loop
//! - [`runtime`]: concurrent task submission, status and cancellation
//! - [`shutdown`]: signal handling

pub mod orchestrator;
pub mod planner;
pub mod runtime;
pub mod shutdown;
pub mod state;

pub use orchestrator::{Orchestrator, TaskOutcome};
pub use planner::{Plan, PlanningPolicy, SkillPlanner};
pub use runtime::{TaskRuntime, TaskStatus};
pub use state::{Attempt, LoopPhase, LoopState, Observation};
