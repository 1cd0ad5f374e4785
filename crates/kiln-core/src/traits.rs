// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pluggable seams of the runtime: tool handlers and the code generator.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::KilnError;
use crate::types::CodePrompt;

/// The single handler signature every tool implements.
///
/// Handlers receive arguments already normalized against the tool's schema.
/// They should report failures as `Err(message)`; a handler that panics instead
/// is still contained by the sandbox.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Map<String, Value>) -> Result<Value, String>;
}

/// External code-generation backend (an LLM endpoint, a scripted fake, ...).
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Returns the raw generator response for the prompt.
    async fn complete(&self, prompt: &CodePrompt) -> Result<String, KilnError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str {
        "generator"
    }
}
