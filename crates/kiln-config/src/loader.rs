// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./kiln.toml` > `~/.config/kiln/kiln.toml` > `/etc/kiln/kiln.toml`
//! with environment variable overrides via `KILN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KilnConfig;

/// Top-level sections that environment variables may address.
const SECTIONS: &[&str] = &[
    "agent",
    "runtime",
    "registry",
    "skills",
    "sandbox",
    "generator",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kiln/kiln.toml` (system-wide)
/// 3. `~/.config/kiln/kiln.toml` (user XDG config)
/// 4. `./kiln.toml` (local directory)
/// 5. `KILN_*` environment variables
pub fn load_config() -> Result<KilnConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<KilnConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KilnConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KilnConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KilnConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KilnConfig::default()))
        .merge(Toml::file("/etc/kiln/kiln.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kiln/kiln.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kiln.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Only the section prefix is turned into a dot, so `KILN_RUNTIME_MAX_RETRIES`
/// maps to `runtime.max_retries` and not `runtime.max.retries`.
fn env_provider() -> Env {
    Env::prefixed("KILN_").map(|key| section_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env key to its dotted config path.
pub(crate) fn section_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}
