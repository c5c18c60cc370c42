//! Tests for PostgreSQL literal rendering

use pretty_assertions::assert_eq;
use serde_json::json;
use vbatch_core::{LiteralDialect, Value, VbatchError};

use crate::PostgresLiterals;

fn render(value: Value) -> String {
    PostgresLiterals.render(&value).expect("renderable")
}

#[test]
fn test_json_is_cast_to_jsonb() {
    assert_eq!(
        render(Value::Json(json!({"name": "O'Neil"}))),
        r#"'{"name":"O''Neil"}'::jsonb"#
    );
}

#[test]
fn test_bytea_hex_format() {
    assert_eq!(render(Value::Bytes(vec![0x01, 0xff])), r"'\x01ff'::bytea");
}

#[test]
fn test_arrays() {
    assert_eq!(
        render(Value::Array(vec![Value::from("a"), Value::from("b'c")])),
        "ARRAY['a', 'b''c']"
    );
    assert_eq!(
        render(Value::Array(vec![Value::Array(vec![Value::Int32(1)])])),
        "ARRAY[ARRAY[1]]"
    );
    assert_eq!(render(Value::Array(vec![])), "'{}'");
}

#[test]
fn test_special_floats() {
    assert_eq!(render(Value::Float64(f64::NAN)), "'NaN'::float8");
    assert_eq!(render(Value::Float64(f64::INFINITY)), "'Infinity'::float8");
    assert_eq!(render(Value::Float32(f32::NEG_INFINITY)), "'-Infinity'::float4");
    assert_eq!(render(Value::Float64(3.0)), "3.0");
}

#[test]
fn test_plain_values() {
    assert_eq!(render(Value::Bool(false)), "FALSE");
    assert_eq!(render(Value::Null), "NULL");
    assert_eq!(render(Value::Decimal("12.50".into())), "12.50");
    assert_eq!(render(Value::from("Ann")), "'Ann'");
}

#[test]
fn test_unadapted_mapping_inside_array_is_rejected() {
    let value = Value::Array(vec![Value::Map(Default::default())]);
    assert!(matches!(
        PostgresLiterals.render(&value),
        Err(VbatchError::NotSupported(_))
    ));
}

#[test]
fn test_special_numerics_are_cast() {
    assert_eq!(render(Value::Decimal("NaN".into())), "'NaN'::numeric");
    assert_eq!(render(Value::Decimal("-Infinity".into())), "'-Infinity'::numeric");
    assert_eq!(render(Value::Decimal("+Infinity".into())), "'Infinity'::numeric");
    assert_eq!(render(Value::Decimal("-1.25e3".into())), "-1.25e3");
}

#[test]
fn test_malformed_decimal_is_rejected() {
    for text in ["1); DROP TABLE t; --", "nan", "1.2.3"] {
        assert!(matches!(
            PostgresLiterals.render(&Value::Decimal(text.into())),
            Err(VbatchError::Composition(_))
        ));
    }
}
