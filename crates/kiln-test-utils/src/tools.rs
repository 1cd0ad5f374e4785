// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Misbehaving tools and small registries for tests.

use async_trait::async_trait;
use kiln_core::{ParamSpec, ParamType, ToolHandler, ToolSpec};
use kiln_tool::ToolRegistry;
use kiln_tool::builtin::EchoTool;
use serde_json::{Map, Value, json};

/// Always reports a failure.
pub struct FailingTool;

#[async_trait]
impl ToolHandler for FailingTool {
    async fn call(&self, _args: Map<String, Value>) -> Result<Value, String> {
        Err("service unavailable".to_string())
    }
}

/// Panics instead of returning.
pub struct PanickingTool;

#[async_trait]
impl ToolHandler for PanickingTool {
    async fn call(&self, _args: Map<String, Value>) -> Result<Value, String> {
        panic!("tool bug: unwrap on None");
    }
}

/// `always_fails` contract, no parameters.
pub fn failing_spec() -> ToolSpec {
    ToolSpec::builder("always_fails")
        .purpose("A tool that never succeeds")
        .handler(FailingTool)
        .build()
        .expect("failing tool contract is valid")
}

/// `panics` contract with one optional parameter.
pub fn panicking_spec() -> ToolSpec {
    ToolSpec::builder("panics")
        .purpose("A tool with a bug")
        .param(ParamSpec::optional("depth", ParamType::Integer, json!(1)))
        .handler(PanickingTool)
        .build()
        .expect("panicking tool contract is valid")
}

/// Registry holding only `echo`.
pub fn echo_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(EchoTool::spec().expect("echo contract is valid"))
        .expect("empty registry accepts echo");
    registry
}
