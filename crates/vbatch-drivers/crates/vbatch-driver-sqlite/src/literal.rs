//! SQLite literal rendering

use vbatch_core::literal::{AnsiLiterals, decimal_literal, format_float, hex, quote_string};
use vbatch_core::{LiteralDialect, Result, Value, VbatchError};

/// Renders values the way SQLite stores them.
///
/// SQLite has no boolean or JSON storage class: booleans become `1`/`0`,
/// JSON documents and arrays are stored as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteLiterals;

impl LiteralDialect for SqliteLiterals {
    fn render(&self, value: &Value) -> Result<String> {
        match value {
            Value::Bool(v) => Ok(if *v { "1" } else { "0" }.to_string()),
            Value::Float32(v) => render_float(*v as f64),
            Value::Float64(v) => render_float(*v),
            Value::Decimal(v) => render_decimal(v),
            Value::Bytes(v) => Ok(format!("X'{}'", hex(v))),
            Value::Json(v) => Ok(quote_string(&v.to_string())),
            Value::Array(_) => Ok(quote_string(&value.to_json().to_string())),
            other => AnsiLiterals.render(other),
        }
    }
}

/// SQLite reads out-of-range reals as infinity; NaN has no representation
fn render_float(value: f64) -> Result<String> {
    if value.is_nan() {
        Err(VbatchError::NotSupported(
            "SQLite cannot store NaN".into(),
        ))
    } else if value.is_infinite() {
        Ok(if value > 0.0 { "9e999" } else { "-9e999" }.to_string())
    } else {
        Ok(format_float(value))
    }
}

fn render_decimal(text: &str) -> Result<String> {
    match text {
        "Infinity" | "+Infinity" => Ok("9e999".to_string()),
        "-Infinity" => Ok("-9e999".to_string()),
        _ => decimal_literal(text),
    }
}
