// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Skill definitions and the caching skill loader for Kiln.

pub mod definition;
pub mod loader;

pub use definition::{BindingWarning, SkillDefinition, ToolBinding, WorkedExample};
pub use loader::SkillLoader;
