// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Kiln integration tests.
//!
//! Provides scripted stand-ins for the pluggable seams and a harness that
//! wires the real registry, sandbox, skill loader and orchestrator around
//! them, so loop tests run without a model endpoint.
//!
//! # Components
//!
//! - [`ScriptedGenerator`] - code generator replaying queued responses
//! - [`ScriptedPlanner`] - planning policy with a fixed tool sequence
//! - [`tools`] - failing and panicking tools
//! - [`TestHarness`] - the assembled stack over temp directories

pub mod harness;
pub mod mock_generator;
pub mod mock_planner;
pub mod tools;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_generator::ScriptedGenerator;
pub use mock_planner::ScriptedPlanner;
