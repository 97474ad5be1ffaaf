//! Cell values of a loaded table.
//!
//! Experiment records arrive as JSON objects, so a cell is whatever a JSON
//! scalar can be. Integers and floats stay distinct so that participant ids
//! round-trip unchanged. Arrays and objects (word chains, per-trial lists)
//! are carried through as `Nested` and never match a filter.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Nested(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell; `None` for non-numeric cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Nested(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_scalars_map_to_cells() {
        let cells: Vec<Value> = serde_json::from_str(r#"[null, true, 3, 2.5, "post"]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(3),
                Value::Float(2.5),
                Value::Text("post".into()),
            ]
        );
    }

    #[test]
    fn arrays_and_objects_are_nested() {
        let cells: Vec<Value> =
            serde_json::from_str(r#"[["lamp", "light"], {"rt": 812}]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                Value::Nested(serde_json::json!(["lamp", "light"])),
                Value::Nested(serde_json::json!({"rt": 812})),
            ]
        );
        assert_eq!(cells[0].to_string(), r#"["lamp","light"]"#);
        assert_eq!(cells[0].as_str(), None);
    }

    #[test]
    fn numeric_view_covers_ints_and_floats_only() {
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::from("4").as_f64(), None);
        assert_eq!(Value::Null.to_string(), "");
    }
}
