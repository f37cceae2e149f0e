//! Runtime value coercion between dynamic records and typed fields.
//!
//! [`convert`] first attempts a plain serde conversion and then a small set
//! of lenient fallbacks, so `"5"` lands in an `i64` field and `5` lands in a
//! `String` field. `Option<T>` targets accept `null` as `None` and otherwise
//! convert to the inner `T`.

use std::any::type_name;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

/// A value could not be converted to the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} to {expected}: {reason}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: String,
    pub reason: String,
}

impl ConversionError {
    fn new<T>(value: &Value, reason: impl ToString) -> Self {
        Self {
            expected: type_name::<T>(),
            found: describe(value),
            reason: reason.to_string(),
        }
    }
}

/// Convert a dynamic value into `T`.
pub fn convert<T: DeserializeOwned>(value: Value) -> Result<T, ConversionError> {
    let first_error = match T::deserialize(&value) {
        Ok(converted) => return Ok(converted),
        Err(e) => e,
    };

    for candidate in lenient_candidates(&value) {
        if let Ok(converted) = T::deserialize(&candidate) {
            return Ok(converted);
        }
    }

    Err(ConversionError::new::<T>(&value, first_error))
}

/// Serialize a typed value into a dynamic one.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ConversionError> {
    serde_json::to_value(value).map_err(|e| ConversionError {
        expected: "json value",
        found: type_name::<T>().to_string(),
        reason: e.to_string(),
    })
}

/// Round-trip a value through `T`, producing its canonical dynamic form.
///
/// Used for key values so that `1`, `1.0` and `"1"` all address the same
/// `i64` key.
pub fn normalize<T: DeserializeOwned + Serialize>(value: Value) -> Result<Value, ConversionError> {
    let typed: T = convert(value)?;
    to_value(&typed)
}

/// Render a value as a literal of the dynamic filter language.
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for ch in s.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    other => out.push(other),
                }
            }
            out.push('"');
            out
        }
        // Composite values have no literal form; compare against their JSON text.
        other => render_literal(&Value::String(other.to_string())),
    }
}

/// Short human-readable description of a value for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(map) => format!("object with {} fields", map.len()),
    }
}

fn lenient_candidates(value: &Value) -> Vec<Value> {
    let mut candidates = Vec::new();
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                if !parsed.is_string() {
                    candidates.push(parsed);
                }
            }
            match trimmed.to_ascii_lowercase().as_str() {
                "true" => candidates.push(Value::Bool(true)),
                "false" => candidates.push(Value::Bool(false)),
                _ => {}
            }
        }
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    candidates.push(Value::Number(Number::from(f as i64)));
                }
            }
            candidates.push(Value::String(n.to_string()));
        }
        Value::Bool(b) => {
            candidates.push(Value::String(b.to_string()));
            candidates.push(Value::Number(Number::from(u8::from(*b))));
        }
        _ => {}
    }
    candidates
}
