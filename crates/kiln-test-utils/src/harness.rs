// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end loop tests.
//!
//! `TestHarness` assembles the full stack (registry from the built-in
//! modules, sandbox over a temp workspace, skill loader over a temp skills
//! directory, orchestrator) around a [`ScriptedGenerator`].

use std::path::Path;
use std::sync::Arc;

use kiln_agent::{Orchestrator, PlanningPolicy, SkillPlanner, TaskOutcome, TaskRuntime};
use kiln_config::model::KilnConfig;
use kiln_core::{KilnError, ToolSpec};
use kiln_sandbox::{Runner, Sandbox};
use kiln_skill::SkillLoader;
use kiln_tool::{BuiltinContext, ToolRegistry};
use tokio_util::sync::CancellationToken;

use crate::mock_generator::ScriptedGenerator;

/// Skill written as `coder.toml` into every harness.
pub const DEFAULT_SKILL: &str = r#"
[skill]
id = "coder"
persona = "A careful engineer who writes small runnable programs."
workflow = ["write the program", "run it", "fix what fails"]

[[bindings]]
tool = "fib"
trigger = "the user asks for Fibonacci numbers"
[bindings.constraints]
n = "between 1 and 90"

[[bindings]]
tool = "run_code"
trigger = "a file must be executed"

[[bindings]]
tool = "stock_quote"
trigger = "market data is needed"
"#;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    max_retries: u32,
    step_timeout_secs: u64,
    planner: Arc<dyn PlanningPolicy>,
    extra_tools: Vec<ToolSpec>,
    skills: Vec<(String, String)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            max_retries: 3,
            step_timeout_secs: 20,
            planner: Arc::new(SkillPlanner),
            extra_tools: Vec::new(),
            skills: vec![("coder".to_string(), DEFAULT_SKILL.to_string())],
        }
    }

    /// Queue generator responses, one per GENERATE.
    pub fn with_responses<S: Into<String>>(
        mut self,
        responses: impl IntoIterator<Item = S>,
    ) -> Self {
        self.responses = responses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_step_timeout_secs(mut self, secs: u64) -> Self {
        self.step_timeout_secs = secs;
        self
    }

    pub fn with_planner(mut self, planner: impl PlanningPolicy + 'static) -> Self {
        self.planner = Arc::new(planner);
        self
    }

    /// Register an extra tool next to the built-ins.
    pub fn with_tool(mut self, spec: ToolSpec) -> Self {
        self.extra_tools.push(spec);
        self
    }

    /// Add a skill document as `<id>.toml`.
    pub fn with_skill(mut self, id: &str, toml: &str) -> Self {
        self.skills.push((id.to_string(), toml.to_string()));
        self
    }

    pub fn build(self) -> Result<TestHarness, KilnError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| KilnError::workspace("cannot create harness directory", e))?;
        let mut config = KilnConfig::default();
        config.runtime.workspace_root = temp_dir.path().join("workspace");
        config.runtime.max_retries = self.max_retries;
        config.runtime.step_timeout_secs = self.step_timeout_secs;
        config.skills.dir = temp_dir.path().join("skills");

        std::fs::create_dir_all(&config.runtime.workspace_root)
            .map_err(|e| KilnError::workspace("cannot create workspace root", e))?;
        std::fs::create_dir_all(&config.skills.dir)
            .map_err(|e| KilnError::workspace("cannot create skills directory", e))?;
        for (id, toml) in &self.skills {
            std::fs::write(config.skills.dir.join(format!("{id}.toml")), toml)
                .map_err(|e| KilnError::workspace("cannot write skill", e))?;
        }

        let runner = Arc::new(Runner::new(&config.sandbox));
        let ctx = BuiltinContext {
            workspace_root: config.runtime.workspace_root.clone(),
            runner: Arc::clone(&runner),
            run_timeout: config.runtime.step_timeout(),
        };
        let mut registry = ToolRegistry::from_modules(&config.registry.modules, &ctx)?;
        for spec in self.extra_tools {
            registry.register(spec)?;
        }
        let registry = Arc::new(registry);

        let generator = Arc::new(ScriptedGenerator::with_responses(self.responses));
        let sandbox = Arc::new(Sandbox::new(generator.clone(), runner, &config.runtime));

        let skills = Arc::new(SkillLoader::new(&config.skills.dir, Arc::clone(&registry)));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&sandbox),
            self.planner,
            self.max_retries,
        ));

        Ok(TestHarness {
            generator,
            registry,
            sandbox,
            skills,
            orchestrator,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete loop stack over temp directories.
pub struct TestHarness {
    /// The scripted generator behind the sandbox.
    pub generator: Arc<ScriptedGenerator>,
    pub registry: Arc<ToolRegistry>,
    pub sandbox: Arc<Sandbox>,
    pub skills: Arc<SkillLoader>,
    pub orchestrator: Arc<Orchestrator>,
    pub config: KilnConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn workspace_root(&self) -> &Path {
        &self.config.runtime.workspace_root
    }

    /// Runs one task with the `coder` skill to completion.
    pub async fn run(&self, request: &str) -> Result<TaskOutcome, KilnError> {
        self.run_with_cancel(request, &CancellationToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        request: &str,
        cancel: &CancellationToken,
    ) -> Result<TaskOutcome, KilnError> {
        let skill = self.skills.load("coder").await?;
        let task_id = format!("task-{}", uuid::Uuid::new_v4().simple());
        Ok(self.orchestrator.run(&task_id, request, &skill, cancel).await)
    }

    /// A task runtime sharing this harness's orchestrator and skills.
    pub fn runtime(&self, max_concurrent_tasks: usize, shutdown: CancellationToken) -> TaskRuntime {
        TaskRuntime::new(
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.skills),
            max_concurrent_tasks,
            shutdown,
        )
    }
}
