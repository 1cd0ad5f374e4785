// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subprocess execution of generated artifacts.
//!
//! The runner for a file is chosen by extension from configuration. Each run
//! gets its own process group. The group is killed when the run ends for any
//! reason (exit, timeout, cancellation, or the future being dropped), and the
//! child is reaped before a result is returned.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use kiln_config::model::SandboxConfig;
use kiln_core::{CapturedOutput, ExecutionResult, KilnError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Grace period for pipe readers once the process group is gone.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs workspace files with the interpreter configured for their extension.
#[derive(Debug, Clone)]
pub struct Runner {
    runners: BTreeMap<String, Vec<String>>,
    max_output_chars: usize,
    error_markers: Vec<String>,
}

enum Exit {
    Finished(std::process::ExitStatus),
    WaitFailed(std::io::Error),
    TimedOut,
    Cancelled,
}

impl Runner {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            runners: config.runners.clone(),
            max_output_chars: config.max_output_chars,
            error_markers: config.error_markers.clone(),
        }
    }

    /// Runner argv prefix for `path`, looked up by extension.
    pub fn runner_for(&self, path: &Path) -> Option<&[String]> {
        let ext = path.extension()?.to_str()?;
        self.runners
            .get(&ext.to_ascii_lowercase())
            .filter(|argv| !argv.is_empty())
            .map(Vec::as_slice)
    }

    /// Runs `entry` with `args`, bounded by `timeout` and `cancel`.
    ///
    /// Only cancellation is reported as an error; every other outcome,
    /// including a missing interpreter, is an [`ExecutionResult`].
    pub async fn run(
        &self,
        call_id: &str,
        entry: &Path,
        args: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, KilnError> {
        let Some(argv) = self.runner_for(entry) else {
            let supported: Vec<String> = self.runners.keys().map(|ext| format!(".{ext}")).collect();
            return Ok(ExecutionResult::runtime_error(
                call_id,
                format!(
                    "Error: No runner found for {}, supported are: {}",
                    entry.display(),
                    supported.join(", ")
                ),
            ));
        };
        let program = &argv[0];
        let (Some(dir), Some(file_name)) = (entry.parent(), entry.file_name()) else {
            return Ok(ExecutionResult::runtime_error(
                call_id,
                format!("Error: {} is not a runnable file path", entry.display()),
            ));
        };

        let mut command = Command::new(program);
        command
            .args(&argv[1..])
            .arg(file_name)
            .args(args)
            .current_dir(if dir.as_os_str().is_empty() { Path::new(".") } else { dir })
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ExecutionResult::runtime_error(
                    call_id,
                    format!("Error: The runtime '{program}' is not installed or not in PATH."),
                ));
            }
            Err(e) => {
                return Ok(ExecutionResult::runtime_error(
                    call_id,
                    format!("Error: failed to start '{program}': {e}"),
                ));
            }
        };
        let pid = child.id();
        let mut guard = GroupGuard(pid);
        debug!(call_id, program = %program, pid, entry = %entry.display(), "artifact started");

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let exit = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => Exit::Finished(status),
                Err(e) => Exit::WaitFailed(e),
            },
            _ = tokio::time::sleep(timeout) => Exit::TimedOut,
            _ = cancel.cancelled() => Exit::Cancelled,
        };

        if let Exit::Finished(_) = exit {
            // Sweep background processes left in the group by the entry process.
            if let Some(pid) = pid {
                kill_group(pid);
            }
        } else {
            terminate(&mut child, pid).await;
        }
        guard.disarm();
        let output = CapturedOutput {
            stdout: drain(stdout).await,
            stderr: drain(stderr).await,
            exit_code: match &exit {
                Exit::Finished(status) => status.code(),
                _ => None,
            },
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match exit {
            Exit::WaitFailed(e) => ExecutionResult::runtime_error(
                call_id,
                format!("Error: failed waiting for '{program}': {e}"),
            ),
            Exit::Cancelled => {
                info!(call_id, pid, "artifact run cancelled, process group killed");
                return Err(KilnError::Cancelled);
            }
            Exit::TimedOut => {
                warn!(call_id, pid, timeout_secs = timeout.as_secs_f64(), "artifact run timed out");
                ExecutionResult::timeout(
                    call_id,
                    format!(
                        "--- Execution Result ({program}) ---\nError: The code execution timed out after {} seconds.\n{}",
                        timeout.as_secs_f64(),
                        self.streams(&output)
                    ),
                )
            }
            Exit::Finished(status) => {
                let marker = self.error_marker(&output);
                if status.success() && marker.is_none() {
                    ExecutionResult::success(
                        call_id,
                        format!(
                            "--- Execution Result ({program}) ---\nSuccess!\nSTDOUT:\n{}",
                            self.truncate(&output.stdout)
                        ),
                        None,
                    )
                } else {
                    let verdict = match (status.code(), marker) {
                        (Some(0), Some(marker)) => format!("Failed (error output: {marker})"),
                        (Some(code), _) => format!("Failed (Exit Code {code})"),
                        (None, _) => "Failed (terminated by signal)".to_string(),
                    };
                    ExecutionResult::runtime_error(
                        call_id,
                        format!(
                            "--- Execution Result ({program}) ---\n{verdict}\n{}",
                            self.streams(&output)
                        ),
                    )
                }
            }
        };

        debug!(call_id, status = %result.status, duration_ms, "artifact finished");
        Ok(result.with_output(output).with_duration_ms(duration_ms))
    }

    fn error_marker(&self, output: &CapturedOutput) -> Option<&str> {
        self.error_markers
            .iter()
            .find(|m| {
                !m.is_empty()
                    && (output.stderr.contains(m.as_str()) || output.stdout.contains(m.as_str()))
            })
            .map(String::as_str)
    }

    fn streams(&self, output: &CapturedOutput) -> String {
        let mut text = format!("STDERR:\n{}\n", self.truncate(&output.stderr));
        if !output.stdout.is_empty() {
            text.push_str("STDOUT:\n");
            text.push_str(&self.truncate(&output.stdout));
        }
        text
    }

    fn truncate(&self, text: &str) -> String {
        match text.char_indices().nth(self.max_output_chars) {
            Some((cut, _)) => format!("{}\n... (output truncated)", &text[..cut]),
            None => text.to_string(),
        }
    }
}

fn spawn_reader<R>(mut pipe: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        // A read error just ends the capture; whatever arrived is kept.
        let _ = pipe.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    })
}

async fn drain(reader: Option<JoinHandle<String>>) -> String {
    let Some(mut handle) = reader else {
        return String::new();
    };
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut handle).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            handle.abort();
            String::new()
        }
    }
}

/// Kills the whole process group of `child` and reaps it.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        kill_group(pid);
    }
    let _ = child.start_kill();
    if let Err(e) = child.wait().await {
        warn!(error = %e, "failed to reap terminated artifact");
    }
}

/// Kills the process group if the run future is dropped mid-flight.
struct GroupGuard(Option<u32>);

impl GroupGuard {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.0.take() {
            kill_group(pid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group id is our own child's pid.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::ExecutionStatus;

    fn runner() -> Runner {
        Runner::new(&SandboxConfig::default())
    }

    fn script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    async fn run(entry: &Path, args: &[String], timeout: Duration) -> ExecutionResult {
        runner()
            .run("call", entry, args, timeout, &CancellationToken::new())
            .await
            .unwrap()
    }

    #[test]
    fn runner_lookup_by_extension() {
        let r = runner();
        assert_eq!(r.runner_for(Path::new("a/main.py")).unwrap(), ["python3"]);
        assert_eq!(r.runner_for(Path::new("main.GO")).unwrap(), ["go", "run"]);
        assert!(r.runner_for(Path::new("main.txt")).is_none());
        assert!(r.runner_for(Path::new("Makefile")).is_none());
    }

    #[tokio::test]
    async fn successful_script_reports_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "main.sh", "echo \"hello $1\"\n");
        let result = run(&entry, &["kiln".to_string()], Duration::from_secs(10)).await;
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.output.stdout, "hello kiln\n");
        assert_eq!(result.output.exit_code, Some(0));
        assert!(result.message.starts_with("--- Execution Result (bash) ---\nSuccess!"));
    }

    #[tokio::test]
    async fn runs_in_artifact_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), "payload").unwrap();
        let entry = script(dir.path(), "main.sh", "cat data.txt\n");
        let result = run(&entry, &[], Duration::from_secs(10)).await;
        assert_eq!(result.output.stdout, "payload");
    }

    #[tokio::test]
    async fn non_zero_exit_is_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "main.sh", "echo partial\necho boom >&2\nexit 3\n");
        let result = run(&entry, &[], Duration::from_secs(10)).await;
        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert_eq!(result.output.exit_code, Some(3));
        assert!(result.message.contains("Failed (Exit Code 3)"));
        assert!(result.message.contains("STDERR:\nboom"));
        assert!(result.message.contains("STDOUT:\npartial"));
    }

    #[tokio::test]
    async fn error_marker_fails_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(
            dir.path(),
            "main.sh",
            "echo 'Traceback (most recent call last):' >&2\nexit 0\n",
        );
        let result = run(&entry, &[], Duration::from_secs(10)).await;
        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert!(result.message.contains("error output"));
    }

    #[tokio::test]
    async fn unknown_extension_is_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "main.txt", "hello");
        let result = run(&entry, &[], Duration::from_secs(10)).await;
        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert!(result.message.contains("No runner found"));
        assert!(result.message.contains(".py"));
    }

    #[tokio::test]
    async fn missing_interpreter_is_runtime_error() {
        let mut config = SandboxConfig::default();
        config
            .runners
            .insert("zz".into(), vec!["kiln-no-such-interpreter".into()]);
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "main.zz", "");
        let result = Runner::new(&config)
            .run("c", &entry, &[], Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert!(result.message.contains("not installed or not in PATH"));
    }

    #[tokio::test]
    async fn long_output_is_truncated_in_report() {
        let mut config = SandboxConfig::default();
        config.max_output_chars = 10;
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "main.sh", "printf 'abcdefghijklmnopqrstuvwxyz'\n");
        let result = Runner::new(&config)
            .run("c", &entry, &[], Duration::from_secs(10), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.message.contains("abcdefghij\n... (output truncated)"));
        assert_eq!(result.output.stdout.len(), 26);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timeout_kills_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        // Background sleeper shares the group; its pid is written for the check below.
        let entry = script(
            dir.path(),
            "main.sh",
            "sleep 30 &\necho $! > child.pid\nsleep 30\n",
        );
        let result = run(&entry, &[], Duration::from_millis(500)).await;
        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert!(result.message.contains("timed out"));

        let child_pid = std::fs::read_to_string(dir.path().join("child.pid")).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let proc_entry = Path::new("/proc").join(child_pid.trim());
        let alive = std::fs::read_to_string(proc_entry.join("stat"))
            .map(|stat| !stat.contains(") Z "))
            .unwrap_or(false);
        assert!(!alive, "background process survived the timeout");
    }

    #[tokio::test]
    async fn cancellation_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let entry = script(dir.path(), "main.sh", "sleep 30\n");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let err = runner()
            .run("c", &entry, &[], Duration::from_secs(30), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, KilnError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
