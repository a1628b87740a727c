//! Generic argument validation against a [`ToolDescriptor`].
//!
//! One routine checks every tool: parameters are visited in declaration
//! order, so the first offending parameter determines the failure.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::error::{ToolError, ToolOutcome};
use super::schema::{ArgValue, BoundsPolicy, ParamKind, ParamSpec, ToolDescriptor};

/// Arguments that passed validation, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: BTreeMap<&'static str, ArgValue>,
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: &'static str, value: ArgValue) {
        self.values.insert(name, value);
    }

    /// Optional string; empty strings count as absent.
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn required_str(&self, name: &str) -> ToolOutcome<&str> {
        match self.values.get(name) {
            Some(ArgValue::String(s)) => Ok(s.as_str()),
            _ => Err(ToolError::missing_parameter(name)),
        }
    }

    /// String value or `""` when absent.
    pub fn str_or_empty(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(ArgValue::String(s)) => s.as_str(),
            _ => "",
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn required_int(&self, name: &str) -> ToolOutcome<i64> {
        self.int(name)
            .ok_or_else(|| ToolError::missing_parameter(name))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ArgValue::Number(n)) => Some(*n),
            Some(ArgValue::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn bool_or(&self, name: &str, fallback: bool) -> bool {
        match self.values.get(name) {
            Some(ArgValue::Boolean(b)) => *b,
            _ => fallback,
        }
    }

    pub fn strings(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(ArgValue::StringArray(items)) => items.as_slice(),
            _ => &[],
        }
    }

    /// Object argument, `None` when absent.
    pub fn object(&self, name: &str) -> Option<&Map<String, Value>> {
        match self.values.get(name) {
            Some(ArgValue::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Validate raw call arguments against the tool's declared parameters.
pub fn validate(descriptor: &ToolDescriptor, raw: &Map<String, Value>) -> ToolOutcome<Arguments> {
    let mut args = Arguments::default();

    for spec in &descriptor.params {
        match raw.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(ToolError::missing_parameter(spec.name));
                }
                if let Some(default) = &spec.default {
                    args.insert(spec.name, default.clone());
                }
            }
            Some(value) => {
                let value = coerce(spec, value)?;
                let value = check_constraints(spec, value)?;
                args.insert(spec.name, value);
            }
        }
    }

    for key in raw.keys() {
        if descriptor.get_param(key).is_none() {
            debug!(tool = descriptor.name, argument = %key, "ignoring undeclared argument");
        }
    }

    Ok(args)
}

fn coerce(spec: &ParamSpec, value: &Value) -> ToolOutcome<ArgValue> {
    let wrong_kind = || {
        ToolError::invalid_parameter(
            spec.name,
            format!("expected {}, got {}", kind_label(spec.kind), value_label(value)),
        )
    };

    match spec.kind {
        ParamKind::String => match value {
            Value::String(s) => Ok(ArgValue::String(s.clone())),
            _ => Err(wrong_kind()),
        },
        ParamKind::Integer => match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ArgValue::Integer(i))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(ArgValue::Integer(f as i64))
                        }
                        _ => Err(wrong_kind()),
                    }
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(ArgValue::Integer)
                .map_err(|_| wrong_kind()),
            _ => Err(wrong_kind()),
        },
        ParamKind::Number => match value {
            Value::Number(n) => n.as_f64().map(ArgValue::Number).ok_or_else(wrong_kind),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(ArgValue::Number(f)),
                _ => Err(wrong_kind()),
            },
            _ => Err(wrong_kind()),
        },
        ParamKind::Boolean => match value {
            Value::Bool(b) => Ok(ArgValue::Boolean(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(ArgValue::Boolean(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(ArgValue::Boolean(false)),
            _ => Err(wrong_kind()),
        },
        ParamKind::StringArray => match value {
            Value::String(s) => Ok(ArgValue::StringArray(vec![s.clone()])),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(wrong_kind()),
                })
                .collect::<ToolOutcome<Vec<_>>>()
                .map(ArgValue::StringArray),
            _ => Err(wrong_kind()),
        },
        ParamKind::Object => match value {
            Value::Object(map) => Ok(ArgValue::Object(map.clone())),
            _ => Err(wrong_kind()),
        },
    }
}

fn check_constraints(spec: &ParamSpec, value: ArgValue) -> ToolOutcome<ArgValue> {
    if let Some(allowed) = spec.allowed {
        if let ArgValue::String(s) = &value {
            if !allowed.contains(&s.as_str()) {
                return Err(ToolError::invalid_parameter(
                    spec.name,
                    format!("'{s}' is not one of [{}]", allowed.join(", ")),
                ));
            }
        }
    }

    if spec.positional {
        let offending = match &value {
            ArgValue::String(s) => s.starts_with('-').then_some(s.as_str()),
            ArgValue::StringArray(items) => items
                .iter()
                .find(|s| s.starts_with('-'))
                .map(String::as_str),
            _ => None,
        };
        if let Some(s) = offending {
            return Err(ToolError::invalid_parameter(
                spec.name,
                format!("'{s}' must not start with '-'"),
            ));
        }
    }

    let Some(bounds) = spec.bounds else {
        return Ok(value);
    };

    let n = match value {
        ArgValue::Integer(i) => i as f64,
        ArgValue::Number(n) => n,
        other => return Ok(other),
    };

    let below = bounds.min.is_some_and(|min| n < min);
    let above = bounds.max.is_some_and(|max| n > max);
    if !below && !above {
        return Ok(value);
    }

    match bounds.policy {
        BoundsPolicy::Reject => Err(ToolError::invalid_parameter(
            spec.name,
            format!("{} is outside {}", format_number(spec.kind, n), range_label(spec)),
        )),
        BoundsPolicy::Clamp => {
            let clamped = match (below, bounds.min, bounds.max) {
                (true, Some(min), _) => min,
                (_, _, Some(max)) => max,
                _ => n,
            };
            debug!(param = spec.name, from = n, to = clamped, "clamped numeric argument");
            Ok(match spec.kind {
                ParamKind::Integer => ArgValue::Integer(clamped as i64),
                _ => ArgValue::Number(clamped),
            })
        }
    }
}

fn range_label(spec: &ParamSpec) -> String {
    let Some(bounds) = spec.bounds else {
        return String::new();
    };
    let min = bounds
        .min
        .map(|m| format_number(spec.kind, m))
        .unwrap_or_else(|| "-inf".to_string());
    let max = bounds
        .max
        .map(|m| format_number(spec.kind, m))
        .unwrap_or_else(|| "inf".to_string());
    format!("[{min}, {max}]")
}

fn format_number(kind: ParamKind, n: f64) -> String {
    if kind == ParamKind::Integer {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn kind_label(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::String => "a string",
        ParamKind::Integer => "an integer",
        ParamKind::Number => "a number",
        ParamKind::Boolean => "a boolean",
        ParamKind::StringArray => "an array of strings",
        ParamKind::Object => "an object",
    }
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
