// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kiln runtime.

use std::time::Duration;

use thiserror::Error;

/// Boxed error source carried by I/O-level variants.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across the registry, sandbox, skill loader and orchestrator.
///
/// Tool handler failures never surface as a `KilnError` outside the sandbox: the
/// sandbox folds them into an [`ExecutionResult`](crate::types::ExecutionResult).
#[derive(Debug, Error)]
pub enum KilnError {
    /// Configuration errors (invalid values, unknown registry modules).
    #[error("configuration error: {0}")]
    Config(String),

    /// A tool contract is malformed (empty name, duplicate parameter, mistyped default).
    #[error("invalid contract for tool `{tool}`: {message}")]
    Contract { tool: String, message: String },

    /// A tool with the same name is already registered.
    #[error("tool `{name}` is already registered")]
    DuplicateName { name: String },

    /// The requested tool is not present in the registry.
    #[error("unknown tool `{name}`")]
    UnknownTool { name: String },

    /// Arguments do not satisfy the tool's declared schema.
    #[error("invalid arguments for `{tool}`: parameter `{parameter}` {reason}")]
    Validation {
        tool: String,
        parameter: String,
        reason: String,
    },

    /// A handler reported a failure.
    #[error("tool execution failed: {message}")]
    Execution { message: String },

    /// Operation exceeded its time bound.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The self-correction loop spent its retry budget without a successful run.
    #[error("loop exhausted after {attempts} attempt(s): {last_error}")]
    LoopExhausted { attempts: u32, last_error: String },

    /// No skill document exists for the requested id.
    #[error("skill not found: {id}")]
    SkillNotFound { id: String },

    /// A skill document exists but could not be read or parsed.
    #[error("skill error: {message}")]
    Skill {
        message: String,
        source: Option<BoxedSource>,
    },

    /// Task workspace I/O failure (cannot create directories or write artifacts).
    #[error("workspace error: {message}")]
    Workspace {
        message: String,
        source: Option<BoxedSource>,
    },

    /// The external code generator failed or returned an unusable response.
    #[error("generation error: {message}")]
    Generation {
        message: String,
        source: Option<BoxedSource>,
    },

    /// The task was cancelled by its caller.
    #[error("task cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KilnError {
    /// Wraps an I/O error raised while touching a task workspace.
    pub fn workspace(message: impl Into<String>, source: std::io::Error) -> Self {
        KilnError::Workspace {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for registry and validation mistakes that only invalidate the current step.
    pub fn is_step_error(&self) -> bool {
        matches!(
            self,
            KilnError::UnknownTool { .. }
                | KilnError::Validation { .. }
                | KilnError::DuplicateName { .. }
                | KilnError::Contract { .. }
        )
    }
}
