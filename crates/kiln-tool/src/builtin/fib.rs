// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fib`: the first `n` Fibonacci numbers.

use async_trait::async_trait;
use kiln_core::{KilnError, ParamSpec, ParamType, ToolHandler, ToolSpec};
use serde_json::{Map, Value, json};

/// Largest `n` whose sequence still fits in a `u64`.
pub const MAX_TERMS: i64 = 93;

pub struct FibTool;

impl FibTool {
    pub fn spec() -> Result<ToolSpec, KilnError> {
        ToolSpec::builder("fib")
            .purpose("Compute the first n Fibonacci numbers")
            .when_to_use("The request needs Fibonacci numbers or a reference sequence")
            .returns("A JSON array of the first n numbers, starting at 0")
            .param(
                ParamSpec::required("n", ParamType::Integer)
                    .describe("How many numbers to return (0 to 93)"),
            )
            .handler(FibTool)
            .build()
    }
}

/// First `n` Fibonacci numbers, starting `0, 1`.
pub fn sequence(n: usize) -> Vec<u64> {
    let mut out = Vec::with_capacity(n);
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        out.push(a);
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    out
}

#[async_trait]
impl ToolHandler for FibTool {
    async fn call(&self, args: Map<String, Value>) -> Result<Value, String> {
        let n = args
            .get("n")
            .and_then(Value::as_i64)
            .ok_or_else(|| "missing required integer 'n'".to_string())?;
        if !(0..=MAX_TERMS).contains(&n) {
            return Err(format!("n must be between 0 and {MAX_TERMS}, got {n}"));
        }
        Ok(json!(sequence(n as usize)))
    }
}
