// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution sandbox for the Kiln runtime.
//!
//! Provides contained tool-handler invocation ([`executor`]), task-scoped
//! workspaces with atomic version writes ([`workspace`]), generator prompt
//! rendering and output parsing ([`codegen`]), and subprocess runs with
//! process-group termination ([`runner`]).

pub mod codegen;
pub mod executor;
pub mod runner;
pub mod sandbox;
pub mod workspace;

pub use runner::Runner;
pub use sandbox::Sandbox;
pub use workspace::{GeneratedFile, TaskWorkspace};
