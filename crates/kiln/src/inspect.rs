// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kiln tools` and `kiln skills`.

use std::fmt::Write as _;
use std::sync::Arc;

use kiln_config::model::KilnConfig;
use kiln_sandbox::Runner;
use kiln_skill::{SkillDefinition, SkillLoader};
use kiln_tool::ToolRegistry;
use kiln_tool::validator::describe_param;

use crate::stack::build_registry;

pub fn list_tools(config: &KilnConfig) -> anyhow::Result<()> {
    let registry = build_registry(config, Arc::new(Runner::new(&config.sandbox)))?;
    print!("{}", render_tools(&registry)?);
    Ok(())
}

pub async fn show_skills(config: &KilnConfig, id: Option<&str>) -> anyhow::Result<()> {
    let registry = build_registry(config, Arc::new(Runner::new(&config.sandbox)))?;
    let loader = SkillLoader::new(&config.skills.dir, Arc::new(registry));

    match id {
        Some(id) => {
            let skill = loader.load(id).await?;
            print!("{}", render_skill(&skill));
        }
        None => {
            let ids = loader.list_available().await?;
            if ids.is_empty() {
                println!("no skills in {}", loader.dir().display());
            }
            for id in ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn render_tools(registry: &ToolRegistry) -> anyhow::Result<String> {
    let mut out = String::new();
    for summary in registry.list() {
        let _ = writeln!(out, "{summary}");
        let spec = registry.resolve(summary.name)?;
        for param in spec.params() {
            let _ = writeln!(out, "    {}", describe_param(param));
        }
    }
    Ok(out)
}

fn render_skill(skill: &SkillDefinition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", skill.id, skill.source.display());
    let _ = writeln!(out, "persona: {}", skill.persona);
    for binding in &skill.bindings {
        let marker = if skill.is_unresolved(&binding.tool) {
            " (unresolved)"
        } else {
            ""
        };
        let _ = writeln!(out, "binds {}{marker}: {}", binding.tool, binding.trigger);
    }
    for warning in &skill.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    out
}
