// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Figment extraction failures are flattened into [`ConfigError`] values. Unknown
//! keys carry a "did you mean" hint picked by Jaro-Winkler similarity against the
//! keys the section accepts.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::Diagnostic;
use thiserror::Error;

/// Similarity a candidate key needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A configuration problem, ready for rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key not accepted by its section.
    #[error("unknown configuration key `{path}`")]
    #[diagnostic(
        code(kiln::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Dotted path of the offending key.
        path: String,
        /// Closest accepted key, if one is close enough.
        suggestion: Option<String>,
        /// Comma-separated keys the section accepts.
        valid_keys: String,
    },

    /// A value of the wrong type.
    #[error("`{path}` has the wrong type: found {found}")]
    #[diagnostic(code(kiln::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        path: String,
        found: String,
        expected: String,
    },

    /// A required key with no default.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(kiln::config::missing_key),
        help("set `{key}` in kiln.toml or through a KILN_* variable")
    )]
    MissingKey { key: String },

    /// A semantic check failed after deserialization.
    #[error("validation error: {message}")]
    #[diagnostic(code(kiln::config::validation))]
    Validation { message: String },

    /// Anything figment reports that has no dedicated variant.
    #[error("configuration error: {0}")]
    #[diagnostic(code(kiln::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? accepted keys: {valid_keys}"),
        None => format!("accepted keys: {valid_keys}"),
    }
}

/// Flattens a figment error (which may hold several) into diagnostics.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let mut path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    path.push(field.clone());
                    ConfigError::UnknownKey {
                        path: path.join("."),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                    }
                }
                Kind::MissingField(field) => {
                    path.push(field.to_string());
                    ConfigError::MissingKey { key: path.join(".") }
                }
                Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                    path: path.join("."),
                    found: found.to_string(),
                    expected: expected.to_string(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Picks the accepted key most similar to `unknown`, if any clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Renders diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_runtime_key() {
        let valid = &["workspace_root", "max_retries", "step_timeout_secs"];
        assert_eq!(
            suggest_key("max_retires", valid),
            Some("max_retries".to_string())
        );
    }

    #[test]
    fn suggests_nothing_for_unrelated_key() {
        let valid = &["workspace_root", "max_retries"];
        assert_eq!(suggest_key("qqqq", valid), None);
    }

    #[test]
    fn help_text_mentions_suggestion() {
        let help = unknown_key_help(Some("dir"), "dir");
        assert!(help.starts_with("did you mean `dir`"));
        assert_eq!(unknown_key_help(None, "a, b"), "accepted keys: a, b");
    }
}
