// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry keyed by unique tool name.
//!
//! The registry is filled once at startup (`&mut self` registration) and then
//! shared as `Arc<ToolRegistry>`; lookups and listings need no locking.

use std::collections::BTreeMap;
use std::sync::Arc;

use kiln_core::{KilnError, ToolSpec, ToolSummary};
use tracing::{debug, info};

use crate::builtin::{BuiltinContext, module_tools};

/// Registry of tool contracts, indexed by name.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<ToolSpec>>,
}

impl ToolRegistry {
    /// Creates an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Startup module scan: registers the built-in tools of every module.
    ///
    /// An unknown module name, or two modules contributing the same tool
    /// name, is a configuration error.
    pub fn from_modules<S: AsRef<str>>(
        modules: &[S],
        ctx: &BuiltinContext,
    ) -> Result<Self, KilnError> {
        let mut registry = Self::new();
        for module in modules {
            for spec in module_tools(module.as_ref(), ctx)? {
                registry.register(spec)?;
            }
        }
        info!(
            modules = modules.len(),
            tools = registry.len(),
            "tool registry initialized"
        );
        Ok(registry)
    }

    /// Registers a contract. Fails if the name is already taken.
    pub fn register(&mut self, spec: ToolSpec) -> Result<Arc<ToolSpec>, KilnError> {
        if self.tools.contains_key(spec.name()) {
            return Err(KilnError::DuplicateName {
                name: spec.name().to_string(),
            });
        }
        let spec = Arc::new(spec);
        debug!(tool = spec.name(), params = spec.params().len(), "tool registered");
        self.tools.insert(spec.name().to_string(), Arc::clone(&spec));
        Ok(spec)
    }

    /// Returns the contract registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<ToolSpec>, KilnError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| KilnError::UnknownTool {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Lazily yields `{name, purpose}` pairs in name order.
    ///
    /// Each call starts a fresh pass; the iterator itself is `Clone`.
    pub fn list(&self) -> impl Iterator<Item = ToolSummary<'_>> + Clone + '_ {
        self.tools.values().map(|spec| ToolSummary {
            name: spec.name(),
            purpose: &spec.doc().purpose,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tools.keys().map(String::as_str)
    }

    /// JSON-Schema tool definitions for prompt construction, sorted by name.
    ///
    /// Each definition has the shape:
    /// ```json
    /// { "name": "fib", "description": "...", "input_schema": { ... } }
    /// ```
    pub fn tool_definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .values()
            .map(|spec| {
                let doc = spec.doc();
                let mut description = doc.purpose.clone();
                if !doc.when_to_use.is_empty() {
                    description.push_str(" Use when: ");
                    description.push_str(&doc.when_to_use);
                }
                if !doc.returns.is_empty() {
                    description.push_str(" Returns: ");
                    description.push_str(&doc.returns);
                }
                serde_json::json!({
                    "name": spec.name(),
                    "description": description,
                    "input_schema": spec.input_schema(),
                })
            })
            .collect()
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
