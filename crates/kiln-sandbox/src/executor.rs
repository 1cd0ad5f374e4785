// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contained invocation of tool handlers.
//!
//! Every call runs on its own tokio task under a time bound. Whatever the
//! handler does (returns an error, panics, hangs) the caller receives an
//! [`ExecutionResult`], never a fault.

use std::any::Any;
use std::time::{Duration, Instant};

use kiln_core::{ExecutionResult, ToolSpec};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Invokes the handler of `spec` with already-validated arguments.
pub async fn execute(
    spec: &ToolSpec,
    args: Map<String, Value>,
    call_id: &str,
    timeout: Duration,
) -> ExecutionResult {
    let handler = spec.handler();
    let started = Instant::now();
    let mut task = tokio::spawn(async move { handler.call(args).await });

    let result = match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(Ok(payload))) => {
            ExecutionResult::success(call_id, render_payload(&payload), Some(payload))
        }
        Ok(Ok(Err(message))) => ExecutionResult::runtime_error(call_id, message),
        Ok(Err(join_error)) => {
            let reason = if join_error.is_panic() {
                panic_message(join_error.into_panic())
            } else {
                "handler task was cancelled".to_string()
            };
            warn!(tool = spec.name(), call_id, reason = %reason, "tool handler faulted");
            ExecutionResult::runtime_error(
                call_id,
                format!("tool `{}` faulted: {reason}", spec.name()),
            )
        }
        Err(_) => {
            task.abort();
            ExecutionResult::timeout(
                call_id,
                format!("tool `{}` timed out after {}s", spec.name(), timeout.as_secs_f64()),
            )
        }
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    info!(
        tool = spec.name(),
        call_id,
        status = %result.status,
        duration_ms,
        "tool executed"
    );
    result.with_duration_ms(duration_ms)
}

fn render_payload(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn panic_message(panic: Box<dyn Any + Send + 'static>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use kiln_core::{ExecutionStatus, ParamSpec, ParamType, ToolHandler};
    use serde_json::json;

    use super::*;

    struct Double;

    #[async_trait]
    impl ToolHandler for Double {
        async fn call(&self, args: Map<String, Value>) -> Result<Value, String> {
            let n = args["n"].as_i64().ok_or("n must be an integer")?;
            Ok(json!(n * 2))
        }
    }

    struct Refuses;

    #[async_trait]
    impl ToolHandler for Refuses {
        async fn call(&self, _args: Map<String, Value>) -> Result<Value, String> {
            Err("upstream unavailable".into())
        }
    }

    struct Panics;

    #[async_trait]
    impl ToolHandler for Panics {
        async fn call(&self, _args: Map<String, Value>) -> Result<Value, String> {
            panic!("index out of bounds");
        }
    }

    struct Hangs;

    #[async_trait]
    impl ToolHandler for Hangs {
        async fn call(&self, _args: Map<String, Value>) -> Result<Value, String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        }
    }

    fn spec_with(handler: impl ToolHandler + 'static) -> ToolSpec {
        ToolSpec::builder("stub")
            .param(ParamSpec::optional("n", ParamType::Integer, json!(0)))
            .handler(handler)
            .build()
            .unwrap()
    }

    fn args(n: i64) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("n".into(), json!(n));
        map
    }

    #[tokio::test]
    async fn successful_handler_yields_payload() {
        let result = execute(&spec_with(Double), args(21), "c1", Duration::from_secs(5)).await;
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.payload, Some(json!(42)));
        assert_eq!(result.message, "42");
        assert_eq!(result.call_id, "c1");
    }

    #[tokio::test]
    async fn handler_error_becomes_runtime_error() {
        let result = execute(&spec_with(Refuses), args(0), "c2", Duration::from_secs(5)).await;
        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert_eq!(result.message, "upstream unavailable");
    }

    #[tokio::test]
    async fn panicking_handler_is_contained() {
        let result = execute(&spec_with(Panics), args(0), "c3", Duration::from_secs(5)).await;
        assert_eq!(result.status, ExecutionStatus::RuntimeError);
        assert!(result.message.contains("index out of bounds"));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_handler_times_out() {
        let result = execute(&spec_with(Hangs), args(0), "c4", Duration::from_secs(20)).await;
        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert!(result.message.contains("timed out"));
    }
}
