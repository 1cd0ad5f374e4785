// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Kiln configuration system.

use kiln_config::diagnostic::ConfigError;
use kiln_config::model::KilnConfig;
use kiln_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_kiln_config() {
    let toml = r#"
[agent]
name = "forge"
log_level = "debug"

[runtime]
workspace_root = "/tmp/kiln-ws"
max_retries = 5
step_timeout_secs = 7
generate_timeout_secs = 60
max_concurrent_tasks = 2

[registry]
modules = ["math"]

[skills]
dir = "/tmp/kiln-skills"

[sandbox]
max_output_chars = 500
error_markers = ["Traceback", "panicked at"]

[sandbox.runners]
py = ["python3", "-u"]

[generator]
endpoint = "http://localhost:9999"
model = "coder"
temperature = 0.2
keep_alive = "1m"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "forge");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.runtime.workspace_root.to_str(), Some("/tmp/kiln-ws"));
    assert_eq!(config.runtime.max_retries, 5);
    assert_eq!(config.runtime.step_timeout().as_secs(), 7);
    assert_eq!(config.runtime.generate_timeout().as_secs(), 60);
    assert_eq!(config.runtime.max_concurrent_tasks, 2);
    assert_eq!(config.registry.modules, vec!["math"]);
    assert_eq!(config.skills.dir.to_str(), Some("/tmp/kiln-skills"));
    assert_eq!(config.sandbox.max_output_chars, 500);
    assert_eq!(config.sandbox.error_markers.len(), 2);
    assert_eq!(config.sandbox.runners["py"], vec!["python3", "-u"]);
    assert_eq!(config.generator.model, "coder");
    assert_eq!(config.generator.keep_alive, "1m");
}

/// An empty document falls back to compiled defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.name, "kiln");
    assert_eq!(config.agent.log_level, "info");
    assert_eq!(config.runtime.max_retries, 3);
    assert_eq!(config.runtime.step_timeout_secs, 20);
    assert_eq!(config.runtime.generate_timeout_secs, 120);
    assert_eq!(config.registry.modules, vec!["core", "math", "code"]);
    assert_eq!(config.sandbox.max_output_chars, 2000);
    assert_eq!(config.sandbox.runners["py"], vec!["python3"]);
    assert_eq!(config.sandbox.runners["go"], vec!["go", "run"]);
}

/// A misspelled key in [runtime] is rejected with a suggestion.
#[test]
fn unknown_runtime_key_is_reported_with_suggestion() {
    let toml = r#"
[runtime]
max_retires = 4
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            path, suggestion, ..
        } => {
            assert!(path.ends_with("max_retires"), "path was {path}");
            assert_eq!(suggestion.as_deref(), Some("max_retries"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// A string where a number belongs is an InvalidType diagnostic.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[runtime]
max_retries = "many"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(
                e,
                ConfigError::InvalidType { path, .. } if path.contains("max_retries")
            )),
        "got {errors:?}"
    );
}

/// Semantic validation runs after a successful extraction.
#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[registry]
modules = ["core", "weather"]
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown module should fail");
    assert!(matches!(
        &errors[0],
        ConfigError::Validation { message } if message.contains("weather")
    ));
}

/// Dotted overrides (what KILN_RUNTIME_MAX_RETRIES becomes) win over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: KilnConfig = Figment::new()
        .merge(Serialized::defaults(KilnConfig::default()))
        .merge(Toml::string("[runtime]\nmax_retries = 2\n"))
        .merge(("runtime.max_retries", 9))
        .extract()
        .expect("override should merge");

    assert_eq!(config.runtime.max_retries, 9);
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_file_is_skipped() {
    let config = kiln_config::load_config_from_path(std::path::Path::new(
        "/nonexistent/path/kiln.toml",
    ))
    .expect("missing file should be skipped");
    assert_eq!(config.agent.name, "kiln");
}

/// The effective configuration serializes back to TOML for `kiln config`.
#[test]
fn defaults_round_trip_through_toml() {
    let rendered = toml::to_string_pretty(&KilnConfig::default()).expect("serialize");
    let parsed = load_config_from_str(&rendered).expect("re-parse");
    assert_eq!(parsed.runtime.max_retries, 3);
    assert_eq!(parsed.sandbox.runners.len(), 7);
}
