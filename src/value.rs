//! Runtime values and the data context instructions are evaluated against
//!
//! Truthiness follows one rule everywhere in the engine: `null`, zero, an empty
//! string, a string holding a number equal to zero (`"0"`, `"0.00"`, `"-0"`),
//! an empty array and an object without keys are falsy. Everything else is truthy.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Path segment that steps from an item context to the context enclosing it
pub const PARENT_SEGMENT: &str = "_parent_";

/// A value from the data context or produced by an instruction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Truthiness as used by conditions, `valueAsBoolean` and negation
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty() && parse_number(s) != Some(0.0),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    /// Reduce the value to a scalar: collections become their size and
    /// numeric-looking strings become numbers.
    pub fn to_scalar(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Array(items) => Value::Number(items.len() as f64),
            Value::Object(map) => Value::Number(map.len() as f64),
            Value::String(s) => match parse_number(s) {
                Some(n) => Value::Number(n),
                None => self.clone(),
            },
            Value::Bool(_) | Value::Number(_) => self.clone(),
        }
    }

    /// Apply `count` boolean negations. `null` is left untouched.
    pub fn negate(self, count: u8) -> Value {
        if count == 0 || self.is_null() {
            return self;
        }
        let mut truthy = self.is_truthy();
        for _ in 0..count {
            truthy = !truthy;
        }
        Value::Bool(truthy)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(_) | Value::Object(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                write!(f, "{}", json)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Parse a finite number, ignoring surrounding whitespace
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number the way it should appear in rendered text: integral
/// values drop the fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn reserved_literal(name: &str) -> Option<Value> {
    match name {
        "true" | "always" => Some(Value::Bool(true)),
        "false" | "never" => Some(Value::Bool(false)),
        "null" | "none" | "undefined" | "z" => Some(Value::Null),
        _ => None,
    }
}

/// Data an instruction is evaluated against
///
/// Item contexts of repeated regions keep a reference to the context they
/// were created from, reachable through the `_parent_` path segment.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    data: &'a Value,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    pub fn new(data: &'a Value) -> Self {
        Self { data, parent: None }
    }

    /// Create a nested context whose `_parent_` is this one
    pub fn child<'b>(&'b self, data: &'b Value) -> Context<'b> {
        Context {
            data,
            parent: Some(self),
        }
    }

    pub fn data(&self) -> &'a Value {
        self.data
    }

    /// Resolve a dotted variable path, falling back to `null` (with a warning)
    /// when any segment is missing.
    pub fn lookup(&self, path: &str) -> Value {
        match self.resolve(path) {
            Some(value) => value,
            None => {
                log::warn!("can't find variable '{}' in the data context", path);
                Value::Null
            }
        }
    }

    /// Resolve a dotted variable path, `None` when it does not exist
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        if let Some(literal) = reserved_literal(segments[0]) {
            return Some(literal);
        }

        let mut context = self;
        let mut start = 0;
        while segments.get(start) == Some(&PARENT_SEGMENT) {
            context = context.parent?;
            start += 1;
        }

        let mut current = context.data;
        let last = segments.len() - 1;
        for (index, segment) in segments.iter().enumerate().skip(start) {
            current = match current {
                Value::Object(map) => map.get(*segment)?,
                Value::Array(items) if *segment == "length" && index == last => {
                    return Some(Value::Number(items.len() as f64));
                }
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                Value::String(s) if *segment == "length" && index == last => {
                    return Some(Value::Number(s.chars().count() as f64));
                }
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_falsy_values() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::from("0").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!value(json!({})).is_truthy());
        assert!(!value(json!([])).is_truthy());
    }

    #[test]
    fn test_truthy_values() {
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(-3.5).is_truthy());
        assert!(Value::from("Ann").is_truthy());
        assert!(value(json!([1, 2])).is_truthy());
        assert!(value(json!({"a": null})).is_truthy());
    }

    #[test]
    fn test_numeric_strings_equal_to_zero_are_falsy() {
        for text in ["0.0", "0.00", "-0", "00", " 0 "] {
            assert!(!Value::from(text).is_truthy(), "{:?} should be falsy", text);
        }
    }

    #[test]
    fn test_non_zero_or_non_numeric_strings_are_truthy() {
        for text in ["0.1", "zero", " ", "NaN", "0x0"] {
            assert!(Value::from(text).is_truthy(), "{:?} should be truthy", text);
        }
    }

    #[test]
    fn test_double_negation_is_truthiness() {
        for v in [
            Value::Null,
            Value::from(0.0),
            Value::from(2.0),
            Value::from("0"),
            Value::from("x"),
            value(json!([1])),
        ] {
            let truthy = v.is_truthy();
            let negated = v.clone().negate(2);
            if v.is_null() {
                assert_eq!(negated, Value::Null);
            } else {
                assert_eq!(negated, Value::Bool(truthy));
                assert_eq!(v.negate(1), Value::Bool(!truthy));
            }
        }
    }

    #[test]
    fn test_to_scalar() {
        assert_eq!(value(json!([1, 2, 3])).to_scalar(), Value::Number(3.0));
        assert_eq!(value(json!({"a": 1, "b": 2})).to_scalar(), Value::Number(2.0));
        assert_eq!(Value::from("42").to_scalar(), Value::Number(42.0));
        assert_eq!(Value::from("4x").to_scalar(), Value::from("4x"));
        assert_eq!(Value::from("").to_scalar(), Value::from(""));
        assert_eq!(Value::Bool(true).to_scalar(), Value::Bool(true));
        assert_eq!(Value::Null.to_scalar(), Value::Null);
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number(" -2.5 "), Some(-2.5));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
    }

    #[test]
    fn test_lookup_dotted_path() {
        let data = value(json!({"user": {"name": "Ann", "tags": ["a", "b"]}}));
        let ctx = Context::new(&data);
        assert_eq!(ctx.lookup("user.name"), Value::from("Ann"));
        assert_eq!(ctx.lookup("user.tags.1"), Value::from("b"));
        assert_eq!(ctx.lookup("user.tags.length"), Value::Number(2.0));
        assert_eq!(ctx.lookup("user.name.length"), Value::Number(3.0));
    }

    #[test]
    fn test_lookup_missing_is_null() {
        let data = value(json!({"user": {"name": "Ann"}}));
        let ctx = Context::new(&data);
        assert_eq!(ctx.lookup("user.email"), Value::Null);
        assert_eq!(ctx.lookup("nobody.name"), Value::Null);
        assert_eq!(ctx.lookup("user.name.first"), Value::Null);
        assert!(ctx.resolve("user.email").is_none());
    }

    #[test]
    fn test_reserved_names_win_over_data() {
        let data = value(json!({"true": false, "null": "x", "always": 0}));
        let ctx = Context::new(&data);
        assert_eq!(ctx.lookup("true"), Value::Bool(true));
        assert_eq!(ctx.lookup("false"), Value::Bool(false));
        assert_eq!(ctx.lookup("null"), Value::Null);
        assert_eq!(ctx.lookup("undefined"), Value::Null);
        assert_eq!(ctx.lookup("always"), Value::Bool(true));
    }

    #[test]
    fn test_reserved_aliases() {
        let data = value(json!({
            "always": false,
            "never": true,
            "none": "bound",
            "undefined": "bound",
            "z": "bound"
        }));
        let ctx = Context::new(&data);
        assert_eq!(ctx.lookup("always"), Value::Bool(true));
        assert_eq!(ctx.lookup("never"), Value::Bool(false));
        for alias in ["null", "none", "undefined", "z"] {
            assert_eq!(ctx.resolve(alias), Some(Value::Null), "{} should be null", alias);
        }
        // Only the first segment is reserved
        let data = value(json!({"user": {"z": "bound"}}));
        assert_eq!(Context::new(&data).lookup("user.z"), Value::from("bound"));
    }

    #[test]
    fn test_parent_segment() {
        let root = value(json!({"title": "List", "items": [1, 2]}));
        let item = value(json!({"value": 1, "key": 0}));
        let ctx = Context::new(&root);
        let child = ctx.child(&item);
        assert_eq!(child.lookup("value"), Value::Number(1.0));
        assert_eq!(child.lookup("_parent_.title"), Value::from("List"));
        assert_eq!(child.lookup("title"), Value::Null);
        assert_eq!(ctx.lookup("_parent_.title"), Value::Null);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let data: Value = toml::from_str("count = 3\n[user]\nname = \"Ann\"\n").unwrap();
        let ctx = Context::new(&data);
        assert_eq!(ctx.lookup("count"), Value::Number(3.0));
        assert_eq!(ctx.lookup("user.name"), Value::from("Ann"));
    }
}
