// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the registry, sandbox and orchestrator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Declared type of a tool parameter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl ParamType {
    /// Strict type check with no coercion.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
            ParamType::Any => !value.is_null(),
        }
    }

    /// JSON Schema type keyword for prompt rendering.
    pub fn json_schema_type(&self) -> Option<&'static str> {
        match self {
            ParamType::String => Some("string"),
            ParamType::Integer => Some("integer"),
            ParamType::Number => Some("number"),
            ParamType::Boolean => Some("boolean"),
            ParamType::Array => Some("array"),
            ParamType::Object => Some("object"),
            ParamType::Any => None,
        }
    }
}

/// Required/default marker carried by every parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Presence {
    /// The caller must supply the parameter.
    Required,
    /// Filled with this value when omitted.
    Default(Value),
}

/// One entry of a tool's ordered parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub presence: Presence,
    /// Prompt-only description of the parameter.
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            presence: Presence::Required,
            description: String::new(),
        }
    }

    /// An optional parameter with a default value.
    pub fn optional(name: impl Into<String>, ty: ParamType, default: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            presence: Presence::Default(default),
            description: String::new(),
        }
    }

    /// Attaches a prompt description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self.presence, Presence::Required)
    }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.presence {
            Presence::Required => None,
            Presence::Default(value) => Some(value),
        }
    }
}

/// Structured prose half of a tool contract. Consumed only for prompting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocContract {
    /// One-line purpose shown in tool listings.
    pub purpose: String,
    /// When the planner should pick this tool.
    #[serde(default)]
    pub when_to_use: String,
    /// What a successful payload contains.
    #[serde(default)]
    pub returns: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

/// A request to invoke a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub tool: String,
    pub args: serde_json::Map<String, Value>,
    pub call_id: String,
}

impl ExecutionRequest {
    pub fn new(
        tool: impl Into<String>,
        args: serde_json::Map<String, Value>,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            args,
            call_id: call_id.into(),
        }
    }
}

/// Outcome classification of a tool call or artifact run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    RuntimeError,
    Timeout,
}

/// Raw output captured from a handler or subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Tagged result of every execution. Never a raised fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub call_id: String,
    pub status: ExecutionStatus,
    /// Human-readable summary (success report or error text).
    pub message: String,
    /// Structured handler payload, when the handler produced one.
    pub payload: Option<Value>,
    pub output: CapturedOutput,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn success(
        call_id: impl Into<String>,
        message: impl Into<String>,
        payload: Option<Value>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            status: ExecutionStatus::Success,
            message: message.into(),
            payload,
            output: CapturedOutput::default(),
            duration_ms: 0,
        }
    }

    pub fn runtime_error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ExecutionStatus::RuntimeError,
            message: message.into(),
            payload: None,
            output: CapturedOutput::default(),
            duration_ms: 0,
        }
    }

    pub fn timeout(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            status: ExecutionStatus::Timeout,
            message: message.into(),
            payload: None,
            output: CapturedOutput::default(),
            duration_ms: 0,
        }
    }

    pub fn with_output(mut self, output: CapturedOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// What the generator is asked to produce on one GENERATE step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRequest {
    /// The task-level instruction produced by the planning policy.
    pub instruction: String,
    /// The user's own words. Requested filenames are read from here only.
    #[serde(default)]
    pub request: String,
    /// Tool observations gathered during planning.
    #[serde(default)]
    pub context: Vec<String>,
    /// Code of the artifact being repaired, if this request comes from FIX.
    pub previous_code: Option<String>,
    /// Captured error of the artifact being repaired.
    pub previous_error: Option<String>,
    /// Number of FIX transitions that led to this request.
    pub attempt: u32,
}

impl CodeRequest {
    /// A request whose instruction is the user's request itself.
    pub fn new(instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        Self {
            request: instruction.clone(),
            instruction,
            context: Vec::new(),
            previous_code: None,
            previous_error: None,
            attempt: 0,
        }
    }

    /// Builds the repair request that follows a failed verification.
    pub fn repair(&self, artifact: &CodeArtifact, error: impl Into<String>, attempt: u32) -> Self {
        Self {
            instruction: self.instruction.clone(),
            request: self.request.clone(),
            context: self.context.clone(),
            previous_code: Some(artifact.code.clone()),
            previous_error: Some(error.into()),
            attempt,
        }
    }

    /// Replaces the user request kept next to a rendered instruction.
    pub fn with_user_request(mut self, request: impl Into<String>) -> Self {
        self.request = request.into();
        self
    }

    pub fn is_repair(&self) -> bool {
        self.previous_error.is_some()
    }
}

/// A generated code unit written into a task workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub task_id: String,
    /// Version counter, starting at 1 and bumped on every GENERATE.
    pub version: u32,
    /// Path of the entry file the runner executes.
    pub entry: PathBuf,
    /// Text of the entry file.
    pub code: String,
    /// Language tag of the entry file (fence language or file extension).
    pub language: String,
    /// Every file written for this version.
    pub files: Vec<PathBuf>,
    /// Format problems noticed while extracting the generator output.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Prompt handed to a [`CodeGenerator`](crate::traits::CodeGenerator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePrompt {
    pub system: String,
    pub user: String,
}
