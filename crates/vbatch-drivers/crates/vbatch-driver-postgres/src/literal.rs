//! PostgreSQL literal rendering

use vbatch_core::literal::{AnsiLiterals, decimal_literal, format_float, hex, quote_string};
use vbatch_core::{LiteralDialect, Result, Value};

/// Renders values as PostgreSQL literals.
///
/// JSON documents are cast to `jsonb`, binary data uses the bytea hex format
/// and arrays become `ARRAY[...]` constructors. Assumes
/// `standard_conforming_strings = on`, the server default.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresLiterals;

impl LiteralDialect for PostgresLiterals {
    fn render(&self, value: &Value) -> Result<String> {
        match value {
            Value::Float32(v) => Ok(render_float(*v as f64, "float4")),
            Value::Float64(v) => Ok(render_float(*v, "float8")),
            Value::Decimal(v) => render_decimal(v),
            Value::Bytes(v) => Ok(format!("'\\x{}'::bytea", hex(v))),
            Value::Json(v) => Ok(format!("{}::jsonb", quote_string(&v.to_string()))),
            Value::Array(items) if items.is_empty() => Ok("'{}'".to_string()),
            Value::Array(items) => {
                let rendered = items
                    .iter()
                    .map(|item| self.render(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("ARRAY[{}]", rendered.join(", ")))
            }
            other => AnsiLiterals.render(other),
        }
    }
}

fn render_float(value: f64, type_name: &str) -> String {
    if value.is_nan() {
        format!("'NaN'::{}", type_name)
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("'{}Infinity'::{}", sign, type_name)
    } else {
        format_float(value)
    }
}

/// NUMERIC has its own NaN and, since PostgreSQL 14, infinities
fn render_decimal(text: &str) -> Result<String> {
    match text {
        "NaN" | "Infinity" | "-Infinity" => Ok(format!("'{}'::numeric", text)),
        "+Infinity" => Ok("'Infinity'::numeric".to_string()),
        _ => decimal_literal(text),
    }
}
