// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool contracts: machine-checked schema plus prompt metadata plus handler.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::KilnError;
use crate::traits::ToolHandler;
use crate::types::{DocContract, ParamSpec, Presence};

/// An immutable tool contract.
///
/// Constructed through [`ToolSpec::builder`], which rejects malformed schemas
/// before the contract can reach a registry.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    params: Vec<ParamSpec>,
    doc: DocContract,
    handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    pub fn builder(name: impl Into<String>) -> ToolSpecBuilder {
        ToolSpecBuilder {
            name: name.into(),
            params: Vec::new(),
            doc: DocContract::default(),
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn doc(&self) -> &DocContract {
        &self.doc
    }

    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }

    /// JSON Schema of the parameter object, for prompt construction.
    pub fn input_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            let mut prop = serde_json::Map::new();
            if let Some(ty) = param.ty.json_schema_type() {
                prop.insert("type".into(), ty.into());
            }
            if !param.description.is_empty() {
                prop.insert("description".into(), param.description.clone().into());
            }
            match &param.presence {
                Presence::Required => required.push(serde_json::Value::from(param.name.clone())),
                Presence::Default(value) => {
                    prop.insert("default".into(), value.clone());
                }
            }
            properties.insert(param.name.clone(), prop.into());
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ToolSpec`].
pub struct ToolSpecBuilder {
    name: String,
    params: Vec<ParamSpec>,
    doc: DocContract,
    handler: Option<Arc<dyn ToolHandler>>,
}

impl ToolSpecBuilder {
    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.doc.purpose = purpose.into();
        self
    }

    pub fn when_to_use(mut self, when: impl Into<String>) -> Self {
        self.doc.when_to_use = when.into();
        self
    }

    pub fn returns(mut self, returns: impl Into<String>) -> Self {
        self.doc.returns = returns.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.doc.notes = notes.into();
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn handler(mut self, handler: impl ToolHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn shared_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Validates the contract and freezes it.
    pub fn build(self) -> Result<ToolSpec, KilnError> {
        let contract_err = |message: String| KilnError::Contract {
            tool: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(contract_err("tool name must not be empty".into()));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(contract_err(
                "tool name may only contain ASCII alphanumerics, `_` and `-`".into(),
            ));
        }

        let mut seen = HashSet::new();
        for param in &self.params {
            if param.name.trim().is_empty() {
                return Err(contract_err("parameter names must not be empty".into()));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(contract_err(format!(
                    "parameter `{}` is declared twice",
                    param.name
                )));
            }
            if let Presence::Default(value) = &param.presence {
                if !param.ty.accepts(value) {
                    return Err(contract_err(format!(
                        "default for `{}` does not match declared type {}",
                        param.name, param.ty
                    )));
                }
            }
        }

        let handler = match self.handler {
            Some(handler) => handler,
            None => return Err(contract_err("no handler attached".into())),
        };

        Ok(ToolSpec {
            name: self.name,
            params: self.params,
            doc: self.doc,
            handler,
        })
    }
}

/// `{name, one-line purpose}` pair yielded by registry listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSummary<'a> {
    pub name: &'a str,
    pub purpose: &'a str,
}

impl fmt::Display for ToolSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.purpose)
    }
}
