// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kiln runtime.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Registry module names understood by the built-in tool scan.
pub const REGISTRY_MODULES: &[&str] = &["core", "math", "code"];

/// Top-level Kiln configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KilnConfig {
    /// Agent identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Task runtime: workspace, retry budget and timeouts.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Tool registry module scan.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Skill document location.
    #[serde(default)]
    pub skills: SkillsConfig,

    /// Subprocess runner settings.
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Code generator endpoint.
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Agent identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in logs.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "kiln".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Task runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Root directory under which every task gets its own workspace.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Maximum number of FIX transitions before a task fails.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Bound on a single tool call or artifact run, in seconds.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,

    /// Bound on a single code-generation call, in seconds.
    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,

    /// Tasks allowed to run at the same time.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
}

impl RuntimeConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            max_retries: default_max_retries(),
            step_timeout_secs: default_step_timeout_secs(),
            generate_timeout_secs: default_generate_timeout_secs(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("workspace")
}

fn default_max_retries() -> u32 {
    3
}

fn default_step_timeout_secs() -> u64 {
    20
}

fn default_generate_timeout_secs() -> u64 {
    120
}

fn default_max_concurrent_tasks() -> usize {
    4
}

/// Tool registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Built-in modules scanned at startup (see [`REGISTRY_MODULES`]).
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            modules: default_modules(),
        }
    }
}

fn default_modules() -> Vec<String> {
    REGISTRY_MODULES.iter().map(|m| m.to_string()).collect()
}

/// Skill document configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SkillsConfig {
    /// Directory holding `<id>/skill.toml` or `<id>.toml` documents.
    #[serde(default = "default_skills_dir")]
    pub dir: PathBuf,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            dir: default_skills_dir(),
        }
    }
}

fn default_skills_dir() -> PathBuf {
    PathBuf::from("skills")
}

/// Subprocess runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    /// Characters of stdout/stderr kept in run reports.
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,

    /// Substrings that mark a run as failed even on a zero exit code.
    #[serde(default = "default_error_markers")]
    pub error_markers: Vec<String>,

    /// File extension (without dot) to runner argv prefix.
    #[serde(default = "default_runners")]
    pub runners: BTreeMap<String, Vec<String>>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_output_chars: default_max_output_chars(),
            error_markers: default_error_markers(),
            runners: default_runners(),
        }
    }
}

fn default_max_output_chars() -> usize {
    2000
}

fn default_error_markers() -> Vec<String> {
    vec!["Traceback (most recent call last)".to_string()]
}

fn default_runners() -> BTreeMap<String, Vec<String>> {
    [
        ("py", vec!["python3"]),
        ("js", vec!["node"]),
        ("ts", vec!["ts-node"]),
        ("sh", vec!["bash"]),
        ("go", vec!["go", "run"]),
        ("rb", vec!["ruby"]),
        ("php", vec!["php"]),
    ]
    .into_iter()
    .map(|(ext, argv)| {
        (
            ext.to_string(),
            argv.into_iter().map(str::to_string).collect(),
        )
    })
    .collect()
}

/// Code generator (Ollama-compatible chat endpoint) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Base URL of the chat endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier used for code generation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// How long the backend keeps the model loaded between calls.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            keep_alive: default_keep_alive(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "qwen2.5-coder:7b".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_keep_alive() -> String {
    "5m".to_string()
}
