// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, bounded retry budgets and known registry modules.

use crate::diagnostic::ConfigError;
use crate::model::{KilnConfig, REGISTRY_MODULES};

/// Upper bound on `runtime.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 20;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &KilnConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.runtime.workspace_root.as_os_str().is_empty() {
        errors.push(ConfigError::Validation {
            message: "runtime.workspace_root must not be empty".to_string(),
        });
    }

    if config.runtime.max_retries > MAX_RETRIES_LIMIT {
        errors.push(ConfigError::Validation {
            message: format!(
                "runtime.max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                config.runtime.max_retries
            ),
        });
    }

    if config.runtime.step_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "runtime.step_timeout_secs must be positive".to_string(),
        });
    }

    if config.runtime.generate_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "runtime.generate_timeout_secs must be positive".to_string(),
        });
    }

    if config.runtime.max_concurrent_tasks == 0 {
        errors.push(ConfigError::Validation {
            message: "runtime.max_concurrent_tasks must be at least 1".to_string(),
        });
    }

    for module in &config.registry.modules {
        if !REGISTRY_MODULES.contains(&module.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "registry.modules contains unknown module `{module}` (known: {})",
                    REGISTRY_MODULES.join(", ")
                ),
            });
        }
    }

    if config.skills.dir.as_os_str().is_empty() {
        errors.push(ConfigError::Validation {
            message: "skills.dir must not be empty".to_string(),
        });
    }

    for (ext, argv) in &config.sandbox.runners {
        if argv.is_empty() || argv[0].trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("sandbox.runners.{ext} must name an executable"),
            });
        }
    }

    if config.sandbox.max_output_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "sandbox.max_output_chars must be positive".to_string(),
        });
    }

    if !(0.0..=2.0).contains(&config.generator.temperature) {
        errors.push(ConfigError::Validation {
            message: format!(
                "generator.temperature must be within 0.0..=2.0, got {}",
                config.generator.temperature
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
