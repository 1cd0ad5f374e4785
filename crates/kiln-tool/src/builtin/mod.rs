// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tools, grouped into the modules named in `registry.modules`.
//!
//! | module | tools |
//! |---|---|
//! | `core` | `echo` |
//! | `math` | `fib` |
//! | `code` | `run_code` |

pub mod echo;
pub mod fib;
pub mod run_code;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use echo::EchoTool;
pub use fib::FibTool;
pub use run_code::RunCodeTool;

use kiln_core::{KilnError, ToolSpec};
use kiln_sandbox::Runner;

/// Module names understood by [`module_tools`].
pub const MODULES: &[&str] = &["core", "math", "code"];

/// What the built-in modules need from the runtime.
#[derive(Clone)]
pub struct BuiltinContext {
    pub workspace_root: PathBuf,
    pub runner: Arc<Runner>,
    pub run_timeout: Duration,
}

/// Contracts contributed by one module.
pub fn module_tools(module: &str, ctx: &BuiltinContext) -> Result<Vec<ToolSpec>, KilnError> {
    match module {
        "core" => Ok(vec![EchoTool::spec()?]),
        "math" => Ok(vec![FibTool::spec()?]),
        "code" => Ok(vec![
            RunCodeTool::new(ctx.workspace_root.clone(), Arc::clone(&ctx.runner), ctx.run_timeout)
                .spec()?,
        ]),
        other => Err(KilnError::Config(format!(
            "unknown registry module `{other}` (available: {})",
            MODULES.join(", ")
        ))),
    }
}
