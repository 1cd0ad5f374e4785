// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The planning seam: turns a user request plus the active skill into an
//! initial code request and the tool calls to make first.

use std::fmt::Write as _;

use async_trait::async_trait;
use kiln_core::{CodeRequest, ExecutionRequest, KilnError};
use kiln_skill::SkillDefinition;
use kiln_tool::ToolRegistry;

/// What the planning policy decided for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// First request handed to GENERATE.
    pub code_request: CodeRequest,
    /// Tool calls dispatched before generation; results become context.
    pub tool_calls: Vec<ExecutionRequest>,
    /// Command-line arguments for every VERIFY run.
    pub run_args: Vec<String>,
}

impl Plan {
    pub fn new(code_request: CodeRequest) -> Self {
        Self {
            code_request,
            tool_calls: Vec::new(),
            run_args: Vec::new(),
        }
    }

    pub fn with_tool_call(mut self, call: ExecutionRequest) -> Self {
        self.tool_calls.push(call);
        self
    }

    pub fn with_run_args(mut self, args: Vec<String>) -> Self {
        self.run_args = args;
        self
    }
}

/// Pluggable planning policy. Typically backed by a language model.
#[async_trait]
pub trait PlanningPolicy: Send + Sync {
    async fn plan(
        &self,
        request: &str,
        skill: &SkillDefinition,
        tools: &ToolRegistry,
    ) -> Result<Plan, KilnError>;
}

/// Default policy: renders the skill as guidance around the request and
/// makes no tool calls of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkillPlanner;

#[async_trait]
impl PlanningPolicy for SkillPlanner {
    async fn plan(
        &self,
        request: &str,
        skill: &SkillDefinition,
        tools: &ToolRegistry,
    ) -> Result<Plan, KilnError> {
        if request.trim().is_empty() {
            return Err(KilnError::Validation {
                tool: "plan".to_string(),
                parameter: "request".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(Plan::new(
            CodeRequest::new(render_instruction(request, skill, tools)).with_user_request(request),
        ))
    }
}

/// Renders the skill guidance and the request into one instruction.
pub fn render_instruction(request: &str, skill: &SkillDefinition, tools: &ToolRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Persona: {}", skill.persona.trim());

    let sections: [(&str, &[String]); 3] = [
        ("Style", &skill.style),
        ("Workflow", &skill.workflow),
        ("Never", &skill.negative_constraints),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{title}:");
        for item in items {
            let _ = writeln!(out, "- {item}");
        }
    }

    let bound: Vec<_> = skill
        .bindings
        .iter()
        .filter(|b| tools.contains(&b.tool))
        .collect();
    if !bound.is_empty() {
        let _ = writeln!(out, "Available tools:");
        for summary in tools.list().filter(|s| bound.iter().any(|b| b.tool == s.name)) {
            let _ = writeln!(out, "- {summary}");
            if let Some(binding) = skill.binding(summary.name) {
                if !binding.trigger.is_empty() {
                    let _ = writeln!(out, "  use when {}", binding.trigger);
                }
                for (param, constraint) in &binding.constraints {
                    let _ = writeln!(out, "  {param}: {constraint}");
                }
            }
        }
    }

    for example in &skill.examples {
        let _ = writeln!(out, "Example request: {}", example.request);
        let _ = writeln!(out, "Example response: {}", example.response);
    }

    let _ = write!(out, "Request: {}", request.trim());
    out
}
