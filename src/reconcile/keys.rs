//! Repeat markers, item keys and item contexts

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;

use rustc_hash::FxHasher;
use thiserror::Error;

use crate::value::{format_number, Context, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepeatError {
    #[error("invalid repeat marker '{marker}', expected [name] or {{name}}")]
    InvalidMarker { marker: String },
}

/// Value of the attribute that marks a repeated region
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatMarker {
    /// `[name]`: one instance per item, reconciled by key
    Sequence(String),
    /// `{name}`: exactly one instance with `name` as its context
    Single(String),
}

impl RepeatMarker {
    pub fn name(&self) -> &str {
        match self {
            RepeatMarker::Sequence(name) | RepeatMarker::Single(name) => name,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, RepeatMarker::Sequence(_))
    }
}

impl FromStr for RepeatMarker {
    type Err = RepeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || RepeatError::InvalidMarker {
            marker: s.to_string(),
        };

        let mut chars = trimmed.chars();
        let (Some(open), Some(close)) = (chars.next(), chars.next_back()) else {
            return Err(invalid());
        };
        let name = chars.as_str().trim();
        if name.is_empty() {
            return Err(invalid());
        }
        match (open, close) {
            ('[', ']') => Ok(RepeatMarker::Sequence(name.to_string())),
            ('{', '}') => Ok(RepeatMarker::Single(name.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for RepeatMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatMarker::Sequence(name) => write!(f, "[{}]", name),
            RepeatMarker::Single(name) => write!(f, "{{{}}}", name),
        }
    }
}

/// 64-bit content hash of a value's canonical JSON form, as 16 hex digits
///
/// Objects serialise with sorted keys, so the hash does not depend on the
/// order the data was written in.
pub fn content_hash(value: &Value) -> String {
    let json = serde_json::to_string(value).unwrap_or_default();
    let mut hasher = FxHasher::default();
    hasher.write(json.as_bytes());
    format!("{:016x}", hasher.finish())
}

/// Key of an item: its `id` when that is a string or a number, otherwise a
/// content hash (of the `id` when there is one, of the whole item if not)
pub fn item_key(item: &Value) -> String {
    match item.as_object().and_then(|map| map.get("id")) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => format_number(*id),
        Some(other) => content_hash(other),
        None => content_hash(item),
    }
}

/// One element of the collection behind a repeated region
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatItem {
    pub key: String,
    /// Data the instance is rendered with
    pub data: Value,
}

impl RepeatItem {
    /// Build the item for `raw` found at `index`. Scalars are wrapped as
    /// `{value, key}`; objects and arrays are used as they are.
    pub fn new(raw: Value, index: usize) -> Self {
        let key = item_key(&raw);
        let data = match raw {
            Value::Object(_) | Value::Array(_) => raw,
            scalar => Value::Object(BTreeMap::from([
                ("key".to_string(), Value::Number(index as f64)),
                ("value".to_string(), scalar),
            ])),
        };
        Self { key, data }
    }
}

/// Collect the items a marker iterates over.
///
/// Returns `None` when the named value is missing, in which case the region
/// should be left as it is.
pub fn collect_items(marker: &RepeatMarker, context: &Context) -> Option<Vec<RepeatItem>> {
    let value = match context.resolve(marker.name()) {
        Some(value) if !value.is_null() => value,
        _ => {
            log::warn!("repeat value '{}' not found in the data context", marker.name());
            return None;
        }
    };

    let raw_items = match (marker, value) {
        (RepeatMarker::Single(_), value) => vec![value],
        (RepeatMarker::Sequence(_), Value::Array(items)) => items,
        (RepeatMarker::Sequence(_), Value::Object(map)) => map
            .into_iter()
            .map(|(key, value)| {
                Value::Object(BTreeMap::from([
                    ("key".to_string(), Value::String(key)),
                    ("value".to_string(), value),
                ]))
            })
            .collect(),
        (RepeatMarker::Sequence(name), other) => {
            log::warn!(
                "repeat value '{}' is a {} and can't be iterated",
                name,
                other.kind_name()
            );
            Vec::new()
        }
    };

    Some(
        raw_items
            .into_iter()
            .enumerate()
            .map(|(index, raw)| RepeatItem::new(raw, index))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_markers() {
        assert_eq!(
            "[items]".parse::<RepeatMarker>(),
            Ok(RepeatMarker::Sequence("items".to_string()))
        );
        assert_eq!(
            " { user.address } ".parse::<RepeatMarker>(),
            Ok(RepeatMarker::Single("user.address".to_string()))
        );
        for bad in ["items", "[]", "[items}", "(items)", "", "["] {
            assert!(bad.parse::<RepeatMarker>().is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_marker_display_round_trips() {
        for marker in ["[items]", "{user}"] {
            assert_eq!(marker.parse::<RepeatMarker>().unwrap().to_string(), marker);
        }
    }

    #[test]
    fn test_id_is_used_verbatim() {
        assert_eq!(item_key(&Value::from(json!({"id": "u-1", "x": 1}))), "u-1");
        assert_eq!(item_key(&Value::from(json!({"id": 42}))), "42");
        assert_eq!(item_key(&Value::from(json!({"id": 1.5}))), "1.5");
    }

    #[test]
    fn test_non_scalar_id_is_hashed() {
        let a = item_key(&Value::from(json!({"id": {"a": 1}, "name": "x"})));
        let b = item_key(&Value::from(json!({"id": {"a": 1}, "name": "y"})));
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_content_hash_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": [1, 2]}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": [1, 2], "a": 1}"#).unwrap();
        assert_eq!(item_key(&a), item_key(&b));
        assert_ne!(item_key(&a), item_key(&Value::from(json!({"a": 2, "b": [1, 2]}))));
    }

    #[test]
    fn test_scalar_items_are_wrapped() {
        let data = Value::from(json!({"tags": ["x", "y"]}));
        let ctx = Context::new(&data);
        let marker = RepeatMarker::Sequence("tags".to_string());
        let items = collect_items(&marker, &ctx).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].data, Value::from(json!({"value": "y", "key": 1})));
        assert_eq!(items[0].key, content_hash(&Value::from("x")));
    }

    #[test]
    fn test_object_entries() {
        let data = Value::from(json!({"prices": {"b": 2, "a": 1}}));
        let ctx = Context::new(&data);
        let marker = RepeatMarker::Sequence("prices".to_string());
        let items = collect_items(&marker, &ctx).unwrap();
        let data: Vec<Value> = items.into_iter().map(|i| i.data).collect();
        assert_eq!(
            data,
            vec![
                Value::from(json!({"key": "a", "value": 1})),
                Value::from(json!({"key": "b", "value": 2})),
            ]
        );
    }

    #[test]
    fn test_single_marker_yields_one_item() {
        let data = Value::from(json!({"user": {"name": "Ann"}, "list": [1, 2]}));
        let ctx = Context::new(&data);
        let items = collect_items(&RepeatMarker::Single("list".to_string()), &ctx).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].data, Value::from(json!([1, 2])));
    }

    #[test]
    fn test_missing_and_scalar_values() {
        let data = Value::from(json!({"count": 3}));
        let ctx = Context::new(&data);
        assert_eq!(
            collect_items(&RepeatMarker::Sequence("nothing".to_string()), &ctx),
            None
        );
        assert_eq!(
            collect_items(&RepeatMarker::Sequence("count".to_string()), &ctx),
            Some(Vec::new())
        );
    }
}
