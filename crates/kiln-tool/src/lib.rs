// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry, parameter validator, and built-in tools for Kiln.
//!
//! Tools are registered once at startup, from the configured module list or
//! by hand, and looked up by name. Arguments pass through [`validate`] before
//! they reach a handler.

pub mod builtin;
pub mod registry;
pub mod validator;

pub use builtin::BuiltinContext;
pub use registry::ToolRegistry;
pub use validator::{validate, validate_map};
