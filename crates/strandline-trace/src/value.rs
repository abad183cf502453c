//! Runtime value representation for traced executions.
//!
//! [`Value`] is what an executor pushes onto the stack. Literals are turned
//! into values with [`Value::from_json`]; lists and maps nest, which is what
//! provenance search looks inside.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strandline_core::OpId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    /// Map entries in insertion order.
    Map(IndexMap<String, Value>),
    /// A lambda value; `lambda` is the operation that created it.
    Closure { lambda: OpId, captures: Vec<Value> },
    /// An error value raised by the executor and left on the stack.
    Error(String),
}

/// One step from a value into a nested value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Where a value was found in a stack: the stack slot (bottom is 0) and the
/// path inside that slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePath {
    pub slot: usize,
    pub path: Vec<PathSegment>,
}

impl Value {
    /// Converts a literal's JSON value.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Truthiness as seen by conditionals and assertions: `null`, `false`,
    /// zero, NaN and the empty string are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Closure { .. } | Value::Error(_) => true,
        }
    }

    /// Path to the first occurrence of `target` in this value (itself
    /// included), searching depth-first.
    pub fn find(&self, target: &Value) -> Option<Vec<PathSegment>> {
        if self == target {
            return Some(Vec::new());
        }
        let (segment, mut path) = match self {
            Value::List(items) => items
                .iter()
                .enumerate()
                .find_map(|(idx, item)| item.find(target).map(|path| (PathSegment::Index(idx), path)))?,
            Value::Map(entries) => entries
                .iter()
                .find_map(|(key, item)| item.find(target).map(|path| (PathSegment::Key(key.clone()), path)))?,
            _ => return None,
        };
        path.insert(0, segment);
        Some(path)
    }

    /// The nested value at `path`.
    pub fn get(&self, path: &[PathSegment]) -> Option<&Value> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        let child = match (self, first) {
            (Value::List(items), PathSegment::Index(idx)) => items.get(*idx)?,
            (Value::Map(entries), PathSegment::Key(key)) => entries.get(key)?,
            _ => return None,
        };
        child.get(rest)
    }
}

/// Finds `target` in a stack snapshot, bottom slot first.
pub fn find_in_stack(stack: &[Value], target: &Value) -> Option<ValuePath> {
    stack.iter().enumerate().find_map(|(slot, value)| {
        value.find(target).map(|path| ValuePath { slot, path })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn converts_literal_json() {
        let value = Value::from_json(&json!({"a": [1, "x", null]}));
        let mut expected = IndexMap::new();
        expected.insert(
            "a".to_string(),
            Value::List(vec![Value::Number(1.0), Value::Str("x".into()), Value::Null]),
        );
        assert_eq!(value, Value::Map(expected));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::List(Vec::new()).is_truthy());
    }

    #[test]
    fn finds_nested_values_with_their_path() {
        let stack = vec![
            Value::Number(1.0),
            Value::from_json(&json!([0, {"k": 3}])),
        ];
        let found = find_in_stack(&stack, &Value::Number(3.0)).unwrap();
        assert_eq!(found.slot, 1);
        assert_eq!(
            found.path,
            vec![PathSegment::Index(1), PathSegment::Key("k".into())]
        );
        assert_eq!(find_in_stack(&stack, &Value::Number(4.0)), None);
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-5i32..5).prop_map(|n| Value::Number(f64::from(n))),
            "[a-c]{0,2}".prop_map(Value::Str),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
                prop::collection::vec(("[a-c]", inner), 0..3)
                    .prop_map(|entries| Value::Map(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn found_paths_lead_to_the_target(haystack in value(), needle in leaf()) {
            if let Some(path) = haystack.find(&needle) {
                prop_assert_eq!(haystack.get(&path), Some(&needle));
            }
        }
    }
}
