// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The execution sandbox: contained tool calls plus the generate/run pair.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use kiln_config::model::RuntimeConfig;
use kiln_core::{CodeArtifact, CodeGenerator, CodeRequest, ExecutionResult, KilnError, ToolSpec};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codegen::{parse_output, render_prompt, requested_filenames};
use crate::executor;
use crate::runner::Runner;
use crate::workspace::TaskWorkspace;

/// Executes tools and artifacts without letting faults escape.
///
/// The sandbox performs no retries; retry policy belongs to the caller.
pub struct Sandbox {
    generator: Arc<dyn CodeGenerator>,
    runner: Arc<Runner>,
    workspace_root: PathBuf,
    step_timeout: Duration,
    generate_timeout: Duration,
}

impl Sandbox {
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        runner: Arc<Runner>,
        runtime: &RuntimeConfig,
    ) -> Self {
        Self {
            generator,
            runner,
            workspace_root: runtime.workspace_root.clone(),
            step_timeout: runtime.step_timeout(),
            generate_timeout: runtime.generate_timeout(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    pub fn runner(&self) -> &Arc<Runner> {
        &self.runner
    }

    /// Opens the workspace owned by `task_id`.
    pub fn workspace(&self, task_id: &str) -> Result<TaskWorkspace, KilnError> {
        TaskWorkspace::create(&self.workspace_root, task_id)
    }

    /// Invokes a tool handler under the step timeout.
    pub async fn execute(
        &self,
        spec: &ToolSpec,
        args: Map<String, Value>,
        call_id: &str,
    ) -> ExecutionResult {
        executor::execute(spec, args, call_id, self.step_timeout).await
    }

    /// Asks the generator for code and writes it as version `version`.
    ///
    /// Nothing is written if the generator fails, times out or the call is
    /// cancelled; a written version is always complete.
    pub async fn generate(
        &self,
        workspace: &TaskWorkspace,
        version: u32,
        request: &CodeRequest,
        cancel: &CancellationToken,
    ) -> Result<CodeArtifact, KilnError> {
        let prompt = render_prompt(request);
        debug!(
            task_id = workspace.task_id(),
            version,
            generator = self.generator.name(),
            repair = request.is_repair(),
            "requesting code"
        );

        let completion =
            tokio::time::timeout(self.generate_timeout, self.generator.complete(&prompt));
        let raw = tokio::select! {
            reply = completion => {
                match reply {
                    Ok(reply) => reply?,
                    Err(_) => return Err(KilnError::Timeout { duration: self.generate_timeout }),
                }
            }
            _ = cancel.cancelled() => return Err(KilnError::Cancelled),
        };

        let requested = requested_filenames(&request.request);
        let parsed = parse_output(&raw, &requested);
        for warning in &parsed.warnings {
            warn!(
                task_id = workspace.task_id(),
                version,
                warning = %warning,
                "generated output format issue"
            );
        }

        let entry_index = parsed.entry_index();
        let ws = workspace.clone();
        let files = parsed.files.clone();
        let paths = tokio::task::spawn_blocking(move || ws.write_version(version, &files))
            .await
            .map_err(|e| KilnError::Internal(format!("artifact writer panicked: {e}")))??;

        let entry_file = &parsed.files[entry_index];
        let artifact = CodeArtifact {
            task_id: workspace.task_id().to_string(),
            version,
            entry: paths[entry_index].clone(),
            code: entry_file.code.clone(),
            language: entry_file.language.clone(),
            files: paths,
            warnings: parsed.warnings,
        };
        info!(
            task_id = %artifact.task_id,
            version,
            entry = %artifact.entry.display(),
            files = artifact.files.len(),
            "artifact generated"
        );
        Ok(artifact)
    }

    /// Runs an artifact's entry file under `timeout`.
    pub async fn run(
        &self,
        artifact: &CodeArtifact,
        args: &[String],
        timeout: Duration,
    ) -> ExecutionResult {
        let never = CancellationToken::new();
        match self.run_cancellable(artifact, args, timeout, &never).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::runtime_error(artifact_call_id(artifact), e.to_string()),
        }
    }

    /// Like [`Sandbox::run`], but returns `Err(Cancelled)` once `cancel` fires.
    pub async fn run_cancellable(
        &self,
        artifact: &CodeArtifact,
        args: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, KilnError> {
        let call_id = artifact_call_id(artifact);
        let result = self
            .runner
            .run(&call_id, &artifact.entry, args, timeout, cancel)
            .await?;
        info!(
            task_id = %artifact.task_id,
            version = artifact.version,
            status = %result.status,
            duration_ms = result.duration_ms,
            "artifact verified"
        );
        Ok(result)
    }
}

fn artifact_call_id(artifact: &CodeArtifact) -> String {
    format!("{}/v{}", artifact.task_id, artifact.version)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kiln_config::model::SandboxConfig;
    use kiln_core::{CodePrompt, ExecutionStatus};

    use super::*;

    struct Replies(Mutex<VecDeque<Result<String, KilnError>>>);

    impl Replies {
        fn new(replies: Vec<Result<String, KilnError>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(replies.into())))
        }
    }

    #[async_trait]
    impl CodeGenerator for Replies {
        async fn complete(&self, _prompt: &CodePrompt) -> Result<String, KilnError> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(KilnError::Generation {
                        message: "exhausted".into(),
                        source: None,
                    })
                })
        }
    }

    struct Stalls;

    #[async_trait]
    impl CodeGenerator for Stalls {
        async fn complete(&self, _prompt: &CodePrompt) -> Result<String, KilnError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn sandbox(generator: Arc<dyn CodeGenerator>, root: &Path) -> Sandbox {
        let runtime = RuntimeConfig {
            workspace_root: root.to_path_buf(),
            ..RuntimeConfig::default()
        };
        Sandbox::new(generator, Arc::new(Runner::new(&SandboxConfig::default())), &runtime)
    }

    #[tokio::test]
    async fn generate_then_run_succeeds() {
        let root = tempfile::tempdir().unwrap();
        let sb = sandbox(
            Replies::new(vec![Ok("### main.sh\n```bash\necho generated\n```".into())]),
            root.path(),
        );
        let ws = sb.workspace("task-a").unwrap();
        let artifact = sb
            .generate(&ws, 1, &CodeRequest::new("say something"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(artifact.version, 1);
        assert_eq!(artifact.language, "bash");
        assert!(artifact.entry.ends_with("task-a/v1/main.sh"));
        assert_eq!(artifact.code, "echo generated");

        let result = sb.run(&artifact, &[], Duration::from_secs(10)).await;
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.output.stdout, "generated\n");
        assert_eq!(result.call_id, "task-a/v1");
    }

    #[tokio::test]
    async fn filenames_in_skill_prompt_are_not_requested() {
        let root = tempfile::tempdir().unwrap();
        let reply = "### main.sh\n```bash\necho hi\n```";
        let sb = sandbox(Replies::new(vec![Ok(reply.into()), Ok(reply.into())]), root.path());
        let ws = sb.workspace("task-f").unwrap();
        let instruction = "Persona: tidy\nExample: helpers go in utils.py\n\nRequest: print hi";

        let request = CodeRequest::new(instruction).with_user_request("print hi");
        let artifact = sb
            .generate(&ws, 1, &request, &CancellationToken::new())
            .await
            .unwrap();
        assert!(artifact.warnings.is_empty(), "{:?}", artifact.warnings);

        // Without a separate user request the whole instruction is scanned.
        let artifact = sb
            .generate(&ws, 2, &CodeRequest::new(instruction), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(artifact.warnings, vec!["missing requested files: utils.py"]);
    }

    #[tokio::test]
    async fn generator_failure_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let sb = sandbox(
            Replies::new(vec![Err(KilnError::Generation {
                message: "offline".into(),
                source: None,
            })]),
            root.path(),
        );
        let ws = sb.workspace("task-b").unwrap();
        let err = sb
            .generate(&ws, 1, &CodeRequest::new("x"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, KilnError::Generation { .. }));
        assert!(!ws.version_dir(1).exists());
    }

    #[tokio::test]
    async fn cancelled_generation_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let sb = sandbox(Arc::new(Stalls), root.path());
        let ws = sb.workspace("task-c").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = sb
            .generate(&ws, 1, &CodeRequest::new("x"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, KilnError::Cancelled));
        assert_eq!(std::fs::read_dir(ws.dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unwritable_workspace_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let sb = sandbox(
            Replies::new(vec![Ok("```bash\necho hi\n```".into())]),
            root.path(),
        );
        let ws = sb.workspace("task-d").unwrap();
        std::fs::create_dir(ws.version_dir(1)).unwrap();
        let err = sb
            .generate(&ws, 1, &CodeRequest::new("x"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, KilnError::Workspace { .. }));
    }

    #[tokio::test]
    async fn verify_is_repeatable() {
        let root = tempfile::tempdir().unwrap();
        let sb = sandbox(
            Replies::new(vec![Ok("```bash\necho out\nexit 2\n```".into())]),
            root.path(),
        );
        let ws = sb.workspace("task-e").unwrap();
        let artifact = sb
            .generate(&ws, 1, &CodeRequest::new("x"), &CancellationToken::new())
            .await
            .unwrap();
        let first = sb.run(&artifact, &[], Duration::from_secs(10)).await;
        let second = sb.run(&artifact, &[], Duration::from_secs(10)).await;
        assert_eq!(first.status, ExecutionStatus::RuntimeError);
        assert_eq!(first.status, second.status);
        assert_eq!(first.message, second.message);
    }
}
