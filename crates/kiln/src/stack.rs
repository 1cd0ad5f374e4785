// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles registry, sandbox, skill loader and orchestrator from config.

use std::sync::Arc;

use anyhow::Context;
use kiln_agent::{Orchestrator, SkillPlanner};
use kiln_config::model::KilnConfig;
use kiln_ollama::OllamaGenerator;
use kiln_sandbox::{Runner, Sandbox};
use kiln_skill::SkillLoader;
use kiln_tool::{BuiltinContext, ToolRegistry};
use tracing::info;

/// Everything a task needs, built once per process.
pub struct Stack {
    pub skills: Arc<SkillLoader>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Scans the configured built-in modules into a registry.
pub fn build_registry(config: &KilnConfig, runner: Arc<Runner>) -> anyhow::Result<ToolRegistry> {
    let ctx = BuiltinContext {
        workspace_root: config.runtime.workspace_root.clone(),
        runner,
        run_timeout: config.runtime.step_timeout(),
    };
    let registry = ToolRegistry::from_modules(&config.registry.modules, &ctx)
        .context("failed to build tool registry")?;
    Ok(registry)
}

pub fn build(config: &KilnConfig) -> anyhow::Result<Stack> {
    std::fs::create_dir_all(&config.runtime.workspace_root).with_context(|| {
        format!(
            "cannot create workspace root {}",
            config.runtime.workspace_root.display()
        )
    })?;

    let runner = Arc::new(Runner::new(&config.sandbox));
    let registry = Arc::new(build_registry(config, Arc::clone(&runner))?);
    let generator = OllamaGenerator::new(&config.generator, &config.runtime)
        .context("failed to initialize code generator")?;
    let sandbox = Arc::new(Sandbox::new(Arc::new(generator), runner, &config.runtime));
    let skills = Arc::new(SkillLoader::new(&config.skills.dir, Arc::clone(&registry)));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        sandbox,
        Arc::new(SkillPlanner),
        config.runtime.max_retries,
    ));

    info!(
        agent = %config.agent.name,
        tools = registry.len(),
        workspace = %config.runtime.workspace_root.display(),
        "kiln stack ready"
    );
    Ok(Stack {
        skills,
        orchestrator,
    })
}
