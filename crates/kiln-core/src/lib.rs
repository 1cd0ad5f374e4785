// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kiln runtime.
//!
//! This crate provides the error type, the tool contract ([`ToolSpec`]) and the
//! data types that flow between the registry, the execution sandbox, the skill
//! loader and the orchestrator.

pub mod error;
pub mod tool;
pub mod traits;
pub mod types;

pub use error::KilnError;
pub use tool::{ToolSpec, ToolSpecBuilder, ToolSummary};
pub use traits::{CodeGenerator, ToolHandler};
pub use types::{
    CapturedOutput, CodeArtifact, CodePrompt, CodeRequest, DocContract, ExecutionRequest,
    ExecutionResult, ExecutionStatus, ParamSpec, ParamType, Presence,
};
