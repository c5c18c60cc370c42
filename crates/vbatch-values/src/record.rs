//! Input records and the row adapter

use std::borrow::Cow;

use indexmap::IndexMap;
use vbatch_core::{Result, Value, VbatchError};

/// One input row for a bulk statement
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Values bound by position, for `%s` templates
    Positional(Vec<Value>),
    /// Values bound by field name, for `{field}` and `%(field)s` templates
    Named(IndexMap<String, Value>),
}

impl Record {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Record::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Record::Named(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a record from a JSON array or object
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Array(items) => Ok(Record::Positional(
                items.into_iter().map(Value::from_json).collect(),
            )),
            serde_json::Value::Object(fields) => Ok(Record::Named(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            )),
            other => Err(VbatchError::Composition(format!(
                "a row must be a JSON array or object, got `{}`",
                other
            ))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Record::Positional(values) => values.len(),
            Record::Named(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Record::Positional(_) => "positional",
            Record::Named(_) => "named",
        }
    }

    fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Record::Positional(values) => Box::new(values.iter()),
            Record::Named(fields) => Box::new(fields.values()),
        }
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Record::Positional(values)
    }
}

impl From<IndexMap<String, Value>> for Record {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Record::Named(fields)
    }
}

/// Tag nested mappings inside a record so they encode as JSON documents.
///
/// Every top-level field holding a [`Value::Map`] becomes [`Value::Json`];
/// everything else, including arrays, is left untouched. Records without
/// nested mappings are returned borrowed. Applying the adapter twice gives
/// the same result as applying it once.
pub fn adapt(record: &Record) -> Cow<'_, Record> {
    if !record.values().any(Value::is_map) {
        return Cow::Borrowed(record);
    }

    let adapted = match record {
        Record::Positional(values) => Record::Positional(values.iter().map(adapt_value).collect()),
        Record::Named(fields) => Record::Named(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), adapt_value(v)))
                .collect(),
        ),
    };
    Cow::Owned(adapted)
}

fn adapt_value(value: &Value) -> Value {
    match value {
        Value::Map(_) => Value::Json(value.to_json()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_nested_mapping_is_tagged_as_json() {
        let record = Record::from_json(json!({"id": 1, "meta": {"k": "v"}})).expect("record");
        let adapted = adapt(&record);

        let Record::Named(fields) = adapted.as_ref() else {
            panic!("expected named record");
        };
        assert_eq!(fields.get("id"), Some(&Value::Int64(1)));
        assert_eq!(fields.get("meta"), Some(&Value::Json(json!({"k": "v"}))));
    }

    #[test]
    fn test_positional_mapping_is_tagged_as_json() {
        let record = Record::positional([Value::from(1i64), Value::from_json(json!({"a": [1, 2]}))]);
        let adapted = adapt(&record).into_owned();
        assert_eq!(
            adapted,
            Record::Positional(vec![Value::Int64(1), Value::Json(json!({"a": [1, 2]}))])
        );
    }

    #[test]
    fn test_plain_record_is_borrowed() {
        let record = Record::named([("name", Value::from("Ann")), ("age", Value::from(30i64))]);
        assert!(matches!(adapt(&record), Cow::Borrowed(_)));
    }

    #[test]
    fn test_arrays_are_left_alone() {
        let record = Record::positional([Value::from_json(json!([{"a": 1}]))]);
        let adapted = adapt(&record);
        assert!(matches!(adapted, Cow::Borrowed(_)));
    }

    #[test]
    fn test_adapt_is_idempotent() {
        let record = Record::from_json(json!({"a": {"b": {"c": 1}}, "d": null})).expect("record");
        let once = adapt(&record).into_owned();
        let twice = adapt(&once).into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_scalar_json_is_not_a_record() {
        let err = Record::from_json(json!(42)).expect_err("scalar row");
        assert!(matches!(err, VbatchError::Composition(_)));
    }

    #[test]
    fn test_named_record_keeps_field_order() {
        let record = Record::named([("z", 1i64), ("a", 2i64)]);
        let Record::Named(fields) = record else {
            panic!("expected named record");
        };
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["z", "a"]);
    }
}
