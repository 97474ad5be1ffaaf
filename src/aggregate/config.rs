//! Configuration handed to load and compute callbacks.

use crate::spec::ResolvedSelector;
use crate::{Error, Result};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value as Json;
use std::str::FromStr;

/// Caller-supplied options, forwarded verbatim to every callback.
pub type Options = serde_json::Map<String, Json>;

pub const LOAD_SPEC: &str = "load_spec";
pub const LOAD_FUNC: &str = "load_func";
pub const CALL_FUNC: &str = "call_func";
pub const AGGREGATE_ON: &str = "aggregate_on";
pub const NO_EXTRA_COLUMNS: &str = "no_extra_columns";
pub const UNAGGREGATED_LEAVES: &str = "unaggregated_leaves";
pub const COLUMN_CONFLICT: &str = "column_conflict";

/// What to do with filter leaves that have no aggregation-dimension ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnaggregatedLeaves {
    Skip,
    #[default]
    Warn,
    Error,
}

impl FromStr for UnaggregatedLeaves {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip" => Ok(Self::Skip),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(Error::InvalidLoadSpec(format!(
                "{} must be one of skip, warn, error; got '{}'",
                UNAGGREGATED_LEAVES, other
            ))),
        }
    }
}

/// What to do when a loaded table already has a column named like a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnConflict {
    /// Leave the loaded column untouched.
    #[default]
    Keep,
    /// Fail if any loaded cell disagrees with the selector value.
    Error,
}

impl FromStr for ColumnConflict {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keep" => Ok(Self::Keep),
            "error" => Ok(Self::Error),
            other => Err(Error::InvalidLoadSpec(format!(
                "{} must be one of keep, error; got '{}'",
                COLUMN_CONFLICT, other
            ))),
        }
    }
}

/// Key lookup shared by load and call configs. Dimension bindings shadow options.
pub trait ConfigLookup {
    fn groups(&self) -> &IndexMap<String, String>;
    fn options(&self) -> &Options;

    fn get(&self, key: &str) -> Option<Json> {
        match self.groups().get(key) {
            Some(group) => Some(Json::String(group.clone())),
            None => self.options().get(key).cloned(),
        }
    }

    fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Json::String(s) => Some(s),
            _ => None,
        }
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.options().get(key)?.as_f64()
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.options().get(key)?.as_u64()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.options().get(key)?.as_bool()
    }
}

/// Configuration for one load call: base options plus one resolved leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadConfig {
    pub options: Options,
    pub selector: ResolvedSelector,
}

impl LoadConfig {
    /// Flat view; selector keys override option keys.
    pub fn to_mapping(&self) -> Options {
        let mut out = self.options.clone();
        out.extend(self.selector.to_mapping());
        out
    }
}

impl ConfigLookup for LoadConfig {
    fn groups(&self) -> &IndexMap<String, String> {
        &self.selector.groups
    }

    fn options(&self) -> &Options {
        &self.options
    }
}

impl Serialize for LoadConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_mapping().serialize(serializer)
    }
}

/// Configuration for one compute call at an aggregation point.
#[derive(Debug, Clone, PartialEq)]
pub struct CallConfig {
    pub options: Options,
    /// Bindings from the root down to and including the aggregation dimension.
    pub groups: IndexMap<String, String>,
    /// Dimensions seen below the aggregation point, first-seen order.
    pub aggregate_over: Vec<String>,
    pub aggregate_on: String,
    pub iteration: usize,
}

impl CallConfig {
    pub fn to_mapping(&self) -> Options {
        let mut out = self.options.clone();
        for (k, v) in &self.groups {
            out.insert(k.clone(), Json::String(v.clone()));
        }
        out.insert(
            "aggregate_over".to_string(),
            Json::Array(self.aggregate_over.iter().cloned().map(Json::String).collect()),
        );
        out.insert(AGGREGATE_ON.to_string(), Json::String(self.aggregate_on.clone()));
        out.insert("iteration".to_string(), Json::from(self.iteration));
        out
    }
}

impl ConfigLookup for CallConfig {
    fn groups(&self) -> &IndexMap<String, String> {
        &self.groups
    }

    fn options(&self) -> &Options {
        &self.options
    }
}

impl Serialize for CallConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_mapping().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options(value: Json) -> Options {
        match value {
            Json::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn selector_shadows_options() {
        let config = LoadConfig {
            options: options(json!({"story": "base", "data_path": "x.json"})),
            selector: ResolvedSelector::new().bind("story", "carver"),
        };

        assert_eq!(config.get_str("story").as_deref(), Some("carver"));
        assert_eq!(config.get_str("data_path").as_deref(), Some("x.json"));
        assert_eq!(config.to_mapping()["story"], json!("carver"));
    }

    #[test]
    fn call_config_mapping_carries_bookkeeping() {
        let config = CallConfig {
            options: options(json!({"measure": "rating"})),
            groups: [("story".to_string(), "carver".to_string())].into_iter().collect(),
            aggregate_over: vec!["position".to_string()],
            aggregate_on: "story".to_string(),
            iteration: 3,
        };

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "measure": "rating",
                "story": "carver",
                "aggregate_over": ["position"],
                "aggregate_on": "story",
                "iteration": 3
            })
        );
    }

    #[test]
    fn policies_parse() {
        assert_eq!("error".parse::<UnaggregatedLeaves>().unwrap(), UnaggregatedLeaves::Error);
        assert_eq!("keep".parse::<ColumnConflict>().unwrap(), ColumnConflict::Keep);
        assert!("sometimes".parse::<ColumnConflict>().is_err());
    }
}
