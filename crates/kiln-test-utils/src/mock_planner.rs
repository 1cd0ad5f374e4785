// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Planning policy with a fixed tool sequence.

use async_trait::async_trait;
use kiln_agent::{Plan, PlanningPolicy};
use kiln_core::{CodeRequest, ExecutionRequest, KilnError};
use kiln_skill::SkillDefinition;
use kiln_tool::ToolRegistry;
use serde_json::{Map, Value};

/// Uses the request verbatim as the instruction and always plans the same calls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPlanner {
    tool_calls: Vec<ExecutionRequest>,
    run_args: Vec<String>,
}

impl ScriptedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a planned call; `args` must be a JSON object.
    pub fn call(mut self, tool: &str, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let call_id = format!("call-{}", self.tool_calls.len() + 1);
        self.tool_calls.push(ExecutionRequest::new(tool, args, call_id));
        self
    }

    pub fn run_args(mut self, args: &[&str]) -> Self {
        self.run_args = args.iter().map(|a| a.to_string()).collect();
        self
    }
}

#[async_trait]
impl PlanningPolicy for ScriptedPlanner {
    async fn plan(
        &self,
        request: &str,
        _skill: &SkillDefinition,
        _tools: &ToolRegistry,
    ) -> Result<Plan, KilnError> {
        let mut plan = Plan::new(CodeRequest::new(request)).with_run_args(self.run_args.clone());
        plan.tool_calls = self.tool_calls.clone();
        Ok(plan)
    }
}
