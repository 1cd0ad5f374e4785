// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `run_code`: runs a file that already lives inside the workspace root.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiln_core::{KilnError, ParamSpec, ParamType, ToolHandler, ToolSpec};
use kiln_sandbox::Runner;
use kiln_sandbox::workspace::resolve_within;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

pub struct RunCodeTool {
    workspace_root: PathBuf,
    runner: Arc<Runner>,
    timeout: Duration,
}

impl RunCodeTool {
    pub fn new(workspace_root: impl Into<PathBuf>, runner: Arc<Runner>, timeout: Duration) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            runner,
            timeout,
        }
    }

    pub fn spec(self) -> Result<ToolSpec, KilnError> {
        ToolSpec::builder("run_code")
            .purpose("Run a code file from the workspace and capture its output")
            .when_to_use("A generated file must be executed to check its behavior")
            .returns("The execution report with exit status, STDOUT and STDERR")
            .notes("Only files inside the workspace can be run; the runner is chosen by extension")
            .param(
                ParamSpec::required("path", ParamType::String)
                    .describe("File path relative to the workspace root"),
            )
            .param(
                ParamSpec::optional("args", ParamType::Array, json!([]))
                    .describe("Command-line arguments passed to the program"),
            )
            .handler(self)
            .build()
    }
}

#[async_trait]
impl ToolHandler for RunCodeTool {
    async fn call(&self, args: Map<String, Value>) -> Result<Value, String> {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing required 'path' parameter".to_string())?;
        let script_args: Vec<String> = match args.get("args") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };

        let entry = resolve_within(&self.workspace_root, Path::new(path))?;
        // Bounded by the executor's step timeout; never cancelled from here.
        let cancel = CancellationToken::new();
        let result = self
            .runner
            .run("run_code", &entry, &script_args, self.timeout, &cancel)
            .await
            .map_err(|e| e.to_string())?;

        if result.is_success() {
            Ok(Value::String(result.message))
        } else {
            Err(result.message)
        }
    }
}
