//! Rendering values as SQL literals
//!
//! Bulk statements are sent as plain SQL text: every row value is embedded as a
//! literal. Each driver owns its encoding through [`LiteralDialect`]; the
//! [`AnsiLiterals`] fallback covers the common ground.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Result, Value, VbatchError};

static NUMERIC_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid regex")
});

/// Renders a single value as an SQL literal
pub trait LiteralDialect: Send + Sync {
    /// Render `value` as literal SQL text
    fn render(&self, value: &Value) -> Result<String>;
}

/// Standard SQL literal rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiLiterals;

impl LiteralDialect for AnsiLiterals {
    fn render(&self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float32(v) => finite_float(*v as f64)?,
            Value::Float64(v) => finite_float(*v)?,
            Value::Decimal(v) => decimal_literal(v)?,
            Value::String(v) => quote_string(v),
            Value::Bytes(v) => format!("X'{}'", hex(v)),
            Value::Uuid(v) => quote_string(&v.to_string()),
            Value::Date(v) => quote_string(&v.to_string()),
            Value::Time(v) => quote_string(&v.to_string()),
            Value::DateTime(v) => quote_string(&v.to_string()),
            Value::DateTimeUtc(v) => quote_string(&v.to_rfc3339()),
            Value::Json(v) => quote_string(&v.to_string()),
            Value::Array(_) => {
                return Err(VbatchError::NotSupported(
                    "array literals are driver specific".into(),
                ));
            }
            Value::Map(_) => {
                return Err(VbatchError::NotSupported(
                    "nested mappings must be adapted to JSON before rendering".into(),
                ));
            }
        })
    }
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Check decimal text against the numeric literal grammar.
///
/// Decimal values are embedded unquoted, so anything other than a plain
/// number (including `NaN` and `Infinity`) is rejected.
pub fn decimal_literal(text: &str) -> Result<String> {
    if NUMERIC_LITERAL.is_match(text) {
        Ok(text.to_string())
    } else {
        Err(VbatchError::Composition(format!(
            "'{}' is not a numeric literal",
            text.escape_default()
        )))
    }
}

/// Lowercase hex encoding of binary data
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn finite_float(value: f64) -> Result<String> {
    if value.is_finite() {
        Ok(format_float(value))
    } else {
        Err(VbatchError::NotSupported(format!(
            "non-finite float {} has no standard literal",
            value
        )))
    }
}

/// Render a finite float so that it always reads back as a float
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{}.0", text)
    }
}
