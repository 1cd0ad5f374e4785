// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: the fibonacci self-correction scenario over the real
//! stack, and the `kiln` binary driven against a mock chat endpoint.

use std::path::Path;
use std::process::Output;

use kiln_agent::LoopPhase;
use kiln_core::ExecutionStatus;
use kiln_test_utils::{ScriptedPlanner, TestHarness};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BROKEN_FIB: &str = r#"### main.py
```python
def fib(n):
    seq = [0, 1]
    while len(seq) < n:
        seq.append(seq[-1] + seq[-2])
    return seq[:n]

limit = "10"
print(fib(limit - 0))
```
"#;

const FIXED_FIB: &str = r#"### main.py
```python
def fib(n):
    seq = [0, 1]
    while len(seq) < n:
        seq.append(seq[-1] + seq[-2])
    return seq[:n]

limit = "10"
print(fib(int(limit)))
```
"#;

fn python3_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// ---- Fibonacci scenario ----

#[tokio::test]
async fn fibonacci_task_repairs_type_error() {
    if !python3_available() {
        eprintln!("python3 not on PATH, skipping");
        return;
    }
    let harness = TestHarness::builder()
        .with_responses([BROKEN_FIB, FIXED_FIB])
        .with_planner(ScriptedPlanner::new().call("fib", json!({ "n": 10 })))
        .build()
        .unwrap();

    let outcome = harness.run("first 10 fibonacci numbers").await.unwrap();
    assert_eq!(outcome.state.phase, LoopPhase::Done, "{:?}", outcome.error);

    let observation = &outcome.state.observations[0];
    assert_eq!(observation.status, Some(ExecutionStatus::Success));

    assert_eq!(outcome.state.history.len(), 1);
    let failed = &outcome.state.history[0];
    assert_eq!(failed.status, ExecutionStatus::RuntimeError);
    assert!(failed.error.contains("unsupported operand"), "{}", failed.error);

    let result = outcome.state.last_result.clone().unwrap();
    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(
        result.output.stdout.trim(),
        "[0, 1, 1, 2, 3, 5, 8, 13, 21, 34]"
    );

    let prompts = harness.generator.prompts().await;
    assert!(prompts[1].user.contains("unsupported operand"));
    assert!(prompts[1].user.contains("fib(limit - 0)"));

    let artifact = outcome.into_result().unwrap();
    assert_eq!(artifact.version, 2);
    assert_eq!(artifact.language, "python");
    assert!(artifact.code.contains("int(limit)"));
}

#[tokio::test]
async fn run_code_tool_refuses_paths_outside_workspace() {
    let harness = TestHarness::builder()
        .with_responses(["```bash\necho ok\n```"])
        .with_planner(ScriptedPlanner::new().call("run_code", json!({ "path": "/etc/passwd" })))
        .build()
        .unwrap();

    let outcome = harness.run("try to escape").await.unwrap();
    assert_eq!(outcome.state.phase, LoopPhase::Done);
    let observation = &outcome.state.observations[0];
    assert_eq!(observation.status, Some(ExecutionStatus::RuntimeError));
    assert!(observation.message.contains("outside the workspace"));
}

#[tokio::test]
async fn run_code_tool_reruns_a_generated_file() {
    let harness = TestHarness::builder()
        .with_responses(["```bash\necho \"rerun $1\"\n```"])
        .build()
        .unwrap();

    let outcome = harness.run("print a line").await.unwrap();
    let artifact = outcome.into_result().unwrap();
    let relative = artifact.entry.strip_prefix(harness.workspace_root()).unwrap();

    let spec = harness.registry.resolve("run_code").unwrap();
    let args = kiln_tool::validate(
        &spec,
        &json!({ "path": relative.to_string_lossy(), "args": ["again"] }),
    )
    .unwrap();
    let result = harness.sandbox.execute(&spec, args, "manual").await;
    assert_eq!(result.status, ExecutionStatus::Success, "{}", result.message);
    assert!(result.message.contains("rerun again"));
}

// ---- The binary ----

fn write_config(dir: &Path, endpoint: &str) -> std::path::PathBuf {
    let config_path = dir.join("kiln.toml");
    let skills = dir.join("skills");
    std::fs::create_dir_all(&skills).unwrap();
    std::fs::write(
        skills.join("coder.toml"),
        "[skill]\npersona = \"writes small scripts\"\n\n[[bindings]]\ntool = \"run_code\"\ntrigger = \"a file must be executed\"\n",
    )
    .unwrap();
    let config = format!(
        r#"
[agent]
log_level = "warn"

[runtime]
workspace_root = "{workspace}"
max_retries = 1
step_timeout_secs = 10

[skills]
dir = "{skills}"

[generator]
endpoint = "{endpoint}"
model = "coder-test"
"#,
        workspace = dir.join("workspace").display(),
        skills = skills.display(),
    );
    std::fs::write(&config_path, config).unwrap();
    config_path
}

async fn kiln(dir: &Path, args: &[&str]) -> Output {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_kiln"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap()
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "coder-test",
        "message": { "role": "assistant", "content": content },
        "done": true
    }))
}

#[tokio::test]
async fn cli_run_completes_against_mock_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply("```bash\necho 'from the generated script'\n```"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let config = config.to_string_lossy();

    let output = kiln(
        dir.path(),
        &["run", "--config", &config, "--skill", "coder", "print", "a", "line"],
    )
    .await;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stdout: {stdout}\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("DONE after 0 fix(es)"));
    assert!(stdout.contains("from the generated script"));
}

#[tokio::test]
async fn cli_run_exits_nonzero_when_loop_is_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply("```bash\necho nope >&2\nexit 2\n```"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());
    let config = config.to_string_lossy();

    let output = kiln(
        dir.path(),
        &["run", "--config", &config, "--skill", "coder", "--json", "fail", "twice"],
    )
    .await;
    assert!(!output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["state"], "FAILED");
    assert_eq!(status["attempt_count"], 1);
    assert_eq!(status["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cli_tools_and_skills() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1");
    let config = config.to_string_lossy();

    let tools = kiln(dir.path(), &["tools", "--config", &config]).await;
    assert!(tools.status.success());
    let tools = String::from_utf8_lossy(&tools.stdout);
    assert!(tools.contains("echo: "));
    assert!(tools.contains("fib: "));
    assert!(tools.contains("run_code: "));

    let skills = kiln(dir.path(), &["skills", "--config", &config]).await;
    assert!(skills.status.success());
    assert_eq!(String::from_utf8_lossy(&skills.stdout).trim(), "coder");

    let missing = kiln(dir.path(), &["skills", "ghost", "--config", &config]).await;
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("skill not found: ghost"));
}

#[tokio::test]
async fn cli_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("kiln.toml");
    std::fs::write(&config_path, "[runtime]\nmax_retrys = 3\n").unwrap();

    let output = kiln(
        dir.path(),
        &["config", "--config", &config_path.to_string_lossy()],
    )
    .await;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_retrys"));
}
