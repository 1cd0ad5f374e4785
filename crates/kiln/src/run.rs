// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kiln run`: submit one task, wait for its verdict, print a summary.

use std::fmt::Write as _;
use std::process::ExitCode;

use kiln_agent::shutdown::install_signal_handler;
use kiln_agent::{LoopPhase, TaskRuntime, TaskStatus};
use kiln_config::model::KilnConfig;

use crate::stack;

pub async fn run_task(
    config: &KilnConfig,
    skill_id: &str,
    request: &str,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let stack = stack::build(config)?;
    let shutdown = install_signal_handler();
    let runtime = TaskRuntime::new(
        stack.orchestrator,
        stack.skills,
        config.runtime.max_concurrent_tasks,
        shutdown,
    );

    let task_id = runtime.submit_task(skill_id, request).await?;
    let status = runtime.wait(&task_id).await?;
    runtime.forget(&task_id);

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", render_summary(&status));
    }

    Ok(if status.state == LoopPhase::Done {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Human-readable summary of a finished task.
pub fn render_summary(status: &TaskStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "task {} (skill {}): {} after {} fix(es)",
        status.task_id, status.skill_id, status.state, status.attempt_count
    );
    if let Some(path) = &status.artifact_path {
        let _ = writeln!(out, "artifact: {}", path.display());
    }

    for observation in &status.observations {
        let _ = writeln!(out, "tool: {}", observation.summary());
    }

    if status.state == LoopPhase::Done {
        if let Some(output) = &status.output {
            let _ = writeln!(out, "output:\n{}", output.stdout.trim_end());
        }
    } else if let Some(error) = &status.last_error {
        let _ = writeln!(out, "error:\n{}", error.trim_end());
    }

    if !status.history.is_empty() {
        let _ = writeln!(out, "failed attempts:");
        for attempt in &status.history {
            let first_line = attempt.error.lines().next().unwrap_or_default();
            let _ = writeln!(
                out,
                "  v{} [{}] {}",
                attempt.artifact.version, attempt.status, first_line
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_agent::Attempt;
    use kiln_core::{CapturedOutput, CodeArtifact, ExecutionStatus};

    fn artifact(version: u32) -> CodeArtifact {
        CodeArtifact {
            task_id: "task-1".into(),
            version,
            entry: format!("/ws/task-1/v{version}/main.py").into(),
            code: "print(1)".into(),
            language: "python".into(),
            files: vec![],
            warnings: vec![],
        }
    }

    fn status(state: LoopPhase) -> TaskStatus {
        TaskStatus {
            task_id: "task-1".into(),
            skill_id: "coder".into(),
            state,
            attempt_count: 1,
            last_error: None,
            artifact_path: Some("/ws/task-1/v2/main.py".into()),
            output: Some(CapturedOutput {
                stdout: "[0, 1, 1]\n".into(),
                stderr: String::new(),
                exit_code: Some(0),
            }),
            history: vec![Attempt {
                artifact: artifact(1),
                status: ExecutionStatus::RuntimeError,
                error: "--- Execution Result (python3) ---\nFailed (Exit Code 1)".into(),
            }],
            observations: vec![],
            submitted_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn done_summary_shows_output_and_history() {
        let text = render_summary(&status(LoopPhase::Done));
        assert!(text.starts_with("task task-1 (skill coder): DONE after 1 fix(es)"));
        assert!(text.contains("artifact: /ws/task-1/v2/main.py"));
        assert!(text.contains("output:\n[0, 1, 1]"));
        assert!(text.contains("  v1 [runtime_error] --- Execution Result (python3) ---"));
    }

    #[test]
    fn failed_summary_shows_last_error() {
        let mut failed = status(LoopPhase::Failed);
        failed.last_error = Some("Failed (Exit Code 1)".into());
        let text = render_summary(&failed);
        assert!(text.contains("FAILED"));
        assert!(text.contains("error:\nFailed (Exit Code 1)"));
        assert!(!text.contains("output:"));
    }
}
