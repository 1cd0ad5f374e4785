// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argument validation and normalization against a tool's declared schema.
//!
//! Validation is strict about shape (missing required parameters and unknown
//! keys are rejected) and lenient about representation: values that can be
//! converted without losing information are coerced to the declared type.

use kiln_core::{KilnError, ParamSpec, ParamType, Presence, ToolSpec};
use serde_json::{Map, Number, Value};

/// Validates an argument value, which must be a JSON object.
pub fn validate(spec: &ToolSpec, args: &Value) -> Result<Map<String, Value>, KilnError> {
    match args {
        Value::Object(map) => validate_map(spec, map),
        Value::Null => validate_map(spec, &Map::new()),
        other => Err(KilnError::Validation {
            tool: spec.name().to_string(),
            parameter: "<arguments>".to_string(),
            reason: format!("must be an object, got {}", kind(other)),
        }),
    }
}

/// Validates an argument mapping and returns the normalized mapping.
///
/// The result contains exactly the declared parameters: supplied values
/// coerced to their declared type and defaults for omitted optional ones.
pub fn validate_map(
    spec: &ToolSpec,
    args: &Map<String, Value>,
) -> Result<Map<String, Value>, KilnError> {
    let fail = |parameter: &str, reason: String| KilnError::Validation {
        tool: spec.name().to_string(),
        parameter: parameter.to_string(),
        reason,
    };

    if let Some(extra) = args.keys().find(|key| spec.param(key).is_none()) {
        return Err(fail(extra, "is not declared by this tool".into()));
    }

    let mut normalized = Map::with_capacity(spec.params().len());
    for param in spec.params() {
        let supplied = args.get(&param.name).filter(|v| !v.is_null());
        let value = match (supplied, &param.presence) {
            (Some(value), _) => {
                coerce(param.ty, value).map_err(|reason| fail(&param.name, reason))?
            }
            (None, Presence::Default(default)) => default.clone(),
            (None, Presence::Required) => {
                return Err(fail(&param.name, "is required but missing".into()));
            }
        };
        normalized.insert(param.name.clone(), value);
    }
    Ok(normalized)
}

/// Coerces one value to `ty`, or explains why it cannot be.
pub fn coerce(ty: ParamType, value: &Value) -> Result<Value, String> {
    let mismatch = || format!("expected {ty}, got {}", kind(value));
    match ty {
        ParamType::Any if value.is_null() => Err(mismatch()),
        ParamType::Any => Ok(value.clone()),
        ParamType::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch()),
        },
        ParamType::Integer => match value {
            Value::Number(n) => integer_from_number(n).ok_or_else(mismatch),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("expected integer, got non-integer string {s:?}")),
            _ => Err(mismatch()),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => number_from_str(s.trim())
                .ok_or_else(|| format!("expected number, got non-numeric string {s:?}")),
            _ => Err(mismatch()),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        ParamType::Array => match value {
            Value::Array(_) => Ok(value.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Array(_)) => Ok(parsed),
                _ => Err("expected array, got string that is not a JSON array".to_string()),
            },
            _ => Err(mismatch()),
        },
        ParamType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => Ok(parsed),
                _ => Err("expected object, got string that is not a JSON object".to_string()),
            },
            _ => Err(mismatch()),
        },
    }
}

fn integer_from_number(n: &Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return Some(Value::from(i));
    }
    let f = n.as_f64()?;
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then(|| Value::from(f as i64))
}

fn number_from_str(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders a parameter as `name: type (required)` / `name: type = default`.
pub fn describe_param(param: &ParamSpec) -> String {
    match &param.presence {
        Presence::Required => format!("{}: {} (required)", param.name, param.ty),
        Presence::Default(default) => format!("{}: {} = {default}", param.name, param.ty),
    }
}
