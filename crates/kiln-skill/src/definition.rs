// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Skill definition parsing from TOML.
//!
//! A skill document describes a persona, its working style, the tools it may
//! call (with trigger conditions and parameter constraints) and worked
//! examples. It is guidance for the planning policy and is never executed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use kiln_core::KilnError;
use serde::{Deserialize, Serialize};

// --- TOML intermediate structs ---

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SkillFile {
    skill: SkillSection,
    #[serde(default)]
    bindings: Vec<ToolBinding>,
    #[serde(default)]
    examples: Vec<WorkedExample>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SkillSection {
    #[serde(default)]
    id: Option<String>,
    persona: String,
    #[serde(default)]
    style: Vec<String>,
    #[serde(default)]
    workflow: Vec<String>,
    #[serde(default)]
    negative_constraints: Vec<String>,
}

// --- Public types ---

/// One row of a skill's tool-binding table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolBinding {
    pub tool: String,
    /// When the skill should call this tool.
    #[serde(default)]
    pub trigger: String,
    /// Parameter name to a prose constraint on its value.
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

/// A request/response pair illustrating the skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkedExample {
    pub request: String,
    pub response: String,
}

/// A binding that names a tool the registry does not know.
///
/// Non-fatal: the skill loads, and dispatching that tool fails later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingWarning {
    pub skill_id: String,
    pub tool: String,
}

impl fmt::Display for BindingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skill `{}` binds unknown tool `{}`",
            self.skill_id, self.tool
        )
    }
}

/// A parsed skill document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: String,
    pub persona: String,
    pub style: Vec<String>,
    pub workflow: Vec<String>,
    pub negative_constraints: Vec<String>,
    pub bindings: Vec<ToolBinding>,
    pub examples: Vec<WorkedExample>,
    /// Bindings left unresolved at load time.
    pub warnings: Vec<BindingWarning>,
    /// File the definition was read from.
    pub source: PathBuf,
}

impl SkillDefinition {
    pub fn binding(&self, tool: &str) -> Option<&ToolBinding> {
        self.bindings.iter().find(|b| b.tool == tool)
    }

    /// Tool names in binding order.
    pub fn bound_tools(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.iter().map(|b| b.tool.as_str())
    }

    /// True if `tool` was bound but missing from the registry at load time.
    pub fn is_unresolved(&self, tool: &str) -> bool {
        self.warnings.iter().any(|w| w.tool == tool)
    }
}

/// Checks that a skill id is usable as a file name.
pub fn validate_skill_id(id: &str) -> Result<(), KilnError> {
    if id.is_empty() {
        return Err(KilnError::Skill {
            message: "skill id must not be empty".to_string(),
            source: None,
        });
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(KilnError::Skill {
            message: format!(
                "skill id '{id}' contains invalid characters (only alphanumeric, hyphens, underscores allowed)"
            ),
            source: None,
        });
    }
    Ok(())
}

/// Parses a skill document that was requested as `expected_id`.
///
/// An `id` inside the document is optional but must match when present.
pub fn parse_skill(
    toml_content: &str,
    expected_id: &str,
    source: PathBuf,
) -> Result<SkillDefinition, KilnError> {
    let file: SkillFile = toml::from_str(toml_content).map_err(|e| KilnError::Skill {
        message: format!("failed to parse skill '{expected_id}': {e}"),
        source: Some(Box::new(e)),
    })?;

    if let Some(id) = &file.skill.id {
        if id != expected_id {
            return Err(KilnError::Skill {
                message: format!(
                    "skill document {} declares id '{id}', expected '{expected_id}'",
                    source.display()
                ),
                source: None,
            });
        }
    }
    if file.skill.persona.trim().is_empty() {
        return Err(KilnError::Skill {
            message: format!("skill '{expected_id}' has an empty persona"),
            source: None,
        });
    }

    for (i, binding) in file.bindings.iter().enumerate() {
        if binding.tool.trim().is_empty() {
            return Err(KilnError::Skill {
                message: format!("skill '{expected_id}' binding #{} has no tool name", i + 1),
                source: None,
            });
        }
        if file.bindings[..i].iter().any(|b| b.tool == binding.tool) {
            return Err(KilnError::Skill {
                message: format!(
                    "skill '{expected_id}' binds tool '{}' more than once",
                    binding.tool
                ),
                source: None,
            });
        }
    }

    Ok(SkillDefinition {
        id: expected_id.to_string(),
        persona: file.skill.persona,
        style: file.skill.style,
        workflow: file.skill.workflow,
        negative_constraints: file.skill.negative_constraints,
        bindings: file.bindings,
        examples: file.examples,
        warnings: Vec::new(),
        source,
    })
}
