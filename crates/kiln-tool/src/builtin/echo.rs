// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `echo`: returns its message unchanged. Useful for wiring checks.

use async_trait::async_trait;
use kiln_core::{KilnError, ParamSpec, ParamType, ToolHandler, ToolSpec};
use serde_json::{Map, Value};

pub struct EchoTool;

impl EchoTool {
    pub fn spec() -> Result<ToolSpec, KilnError> {
        ToolSpec::builder("echo")
            .purpose("Echo a message back unchanged")
            .when_to_use("Checking that tool dispatch works end to end")
            .returns("The message string")
            .param(ParamSpec::required("message", ParamType::String).describe("Text to echo"))
            .handler(EchoTool)
            .build()
    }
}

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, args: Map<String, Value>) -> Result<Value, String> {
        args.get("message")
            .cloned()
            .ok_or_else(|| "missing required 'message' parameter".to_string())
    }
}
