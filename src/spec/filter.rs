//! Filter descriptors: the terminal payload of a load spec.
//!
//! JSON shape (each key optional, each value a single triple or a list):
//! {
//!   "include": ["match", "volition", "intentional"],
//!   "exclude": [["gte", "age", 65], ["contains", "comment", "^bot"]]
//! }
//!
//! Raw JSON is parsed into `RawFilter` first and then validated into a
//! `FilterDescriptor`, so operator and value-type mistakes surface as typed
//! errors rather than as serde messages.

use crate::{Error, Result};

use indexmap::IndexMap;
use regex::Regex;
use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const INCLUDE: &str = "include";
pub const EXCLUDE: &str = "exclude";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Match,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Match => "match",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Contains => "contains",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        )
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "match" | "eq" => Ok(Operator::Match),
            "gt" => Ok(Operator::Gt),
            "gte" => Ok(Operator::Gte),
            "lt" => Ok(Operator::Lt),
            "lte" => Ok(Operator::Lte),
            "contains" => Ok(Operator::Contains),
            other => Err(Error::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a predicate.
///
/// Integers and floats stay distinct so values are forwarded to loaders
/// exactly as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FilterValue::Int(_) | FilterValue::Float(_))
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Int(i) => write!(f, "{}", i),
            FilterValue::Float(x) => write!(f, "{}", x),
            FilterValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(x: f64) -> Self {
        FilterValue::Float(x)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        FilterValue::Int(i)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

/// A validated `(operator, column, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    op: Operator,
    column: String,
    value: FilterValue,
}

impl Predicate {
    /// Validate the value type against the operator.
    ///
    /// Ordering operators take numbers or text; `contains` takes a regex.
    pub fn new(op: Operator, column: impl Into<String>, value: impl Into<FilterValue>) -> Result<Self> {
        let column = column.into();
        let value = value.into();

        if op.is_ordering() && matches!(value, FilterValue::Bool(_)) {
            return Err(Error::InvalidFilterSpec(format!(
                "operator {} requires a number or text value: ({}, {}, {})",
                op, op, column, value
            )));
        }
        if op == Operator::Contains {
            match &value {
                FilterValue::Text(pattern) => {
                    Regex::new(pattern).map_err(|e| {
                        Error::InvalidFilterSpec(format!(
                            "bad regex in ({}, {}, {}): {}",
                            op, column, value, e
                        ))
                    })?;
                }
                _ => {
                    return Err(Error::InvalidFilterSpec(format!(
                        "operator contains requires a text value: ({}, {}, {})",
                        op, column, value
                    )));
                }
            }
        }

        Ok(Self { op, column, value })
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.op, self.column, self.value)
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(3)?;
        tup.serialize_element(self.op.as_str())?;
        tup.serialize_element(&self.column)?;
        tup.serialize_element(&self.value)?;
        tup.end()
    }
}

/// Row inclusion/exclusion rules. An empty list means the key was absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDescriptor {
    pub include: Vec<Predicate>,
    pub exclude: Vec<Predicate>,
}

impl FilterDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, predicate: Predicate) -> Self {
        self.include.push(predicate);
        self
    }

    pub fn exclude(mut self, predicate: Predicate) -> Self {
        self.exclude.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Per polarity, fall back to `defaults` where this descriptor has no rules.
    pub fn or_defaults(&self, defaults: &FilterDescriptor) -> FilterDescriptor {
        let pick = |own: &Vec<Predicate>, fallback: &Vec<Predicate>| {
            if own.is_empty() {
                fallback.clone()
            } else {
                own.clone()
            }
        };
        FilterDescriptor {
            include: pick(&self.include, &defaults.include),
            exclude: pick(&self.exclude, &defaults.exclude),
        }
    }

    /// Copy without the predicates that target any of `columns`.
    pub fn remove_columns(&self, columns: &[&str]) -> FilterDescriptor {
        self.retain(|p| !columns.contains(&p.column()))
    }

    /// Copy keeping only the predicates that target one of `columns`.
    pub fn keep_columns(&self, columns: &[&str]) -> FilterDescriptor {
        self.retain(|p| columns.contains(&p.column()))
    }

    fn retain(&self, keep: impl Fn(&Predicate) -> bool) -> FilterDescriptor {
        FilterDescriptor {
            include: self.include.iter().filter(|p| keep(p)).cloned().collect(),
            exclude: self.exclude.iter().filter(|p| keep(p)).cloned().collect(),
        }
    }

    /// Parse the `include`/`exclude` entries of a JSON mapping, ignoring other keys.
    pub fn from_mapping(mapping: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut raw = RawFilter::new();
        for key in [INCLUDE, EXCLUDE] {
            if let Some(value) = mapping.get(key) {
                let predicates: RawPredicates = serde_json::from_value(value.clone())
                    .map_err(|e| Error::InvalidFilterSpec(format!("{}: {}", key, e)))?;
                raw.insert(key.to_string(), predicates);
            }
        }
        Self::try_from(raw)
    }
}

impl Serialize for FilterDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = usize::from(!self.include.is_empty()) + usize::from(!self.exclude.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        if !self.include.is_empty() {
            map.serialize_entry(INCLUDE, &self.include)?;
        }
        if !self.exclude.is_empty() {
            map.serialize_entry(EXCLUDE, &self.exclude)?;
        }
        map.end()
    }
}

pub type RawPredicate = (String, String, FilterValue);

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPredicates {
    One(RawPredicate),
    Many(Vec<RawPredicate>),
}

impl RawPredicates {
    fn into_vec(self) -> Vec<RawPredicate> {
        match self {
            RawPredicates::One(p) => vec![p],
            RawPredicates::Many(ps) => ps,
        }
    }
}

/// Filter mapping exactly as written in JSON.
pub type RawFilter = IndexMap<String, RawPredicates>;

impl TryFrom<RawFilter> for FilterDescriptor {
    type Error = Error;

    fn try_from(raw: RawFilter) -> Result<Self> {
        let mut out = FilterDescriptor::new();
        for (key, predicates) in raw {
            let target = match key.as_str() {
                INCLUDE => &mut out.include,
                EXCLUDE => &mut out.exclude,
                other => {
                    return Err(Error::InvalidFilterSpec(format!(
                        "unexpected key '{}': only '{}' and '{}' are allowed",
                        other, INCLUDE, EXCLUDE
                    )));
                }
            };
            for (op, column, value) in predicates.into_vec() {
                target.push(Predicate::new(op.parse()?, column, value)?);
            }
        }
        Ok(out)
    }
}
