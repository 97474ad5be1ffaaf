//! Load spec tree.
//!
//! JSON shape, recursively:
//!   ["story", {"carver_original": ["condition", {...}], ...}]
//!   ["filter", {"include": ["match", "volition", "intentional"]}]
//!
//! The first element names a grouping dimension, or the sentinel "filter"
//! which ends recursion. Branch order is document order and is preserved all
//! the way to the order of load and compute calls.

use crate::spec::filter::{EXCLUDE, FilterDescriptor, INCLUDE, RawFilter};
use crate::{Error, Result};

use indexmap::IndexMap;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

/// Category that terminates recursion.
pub const FILTER: &str = "filter";

/// Dimension synthesised when no aggregation dimension is configured.
pub const ALL: &str = "<all>";

#[derive(Debug, Clone, PartialEq)]
pub enum SpecNode {
    Filter(FilterDescriptor),
    Group {
        dimension: String,
        branches: IndexMap<String, SpecNode>,
    },
}

impl SpecNode {
    pub fn filter(descriptor: FilterDescriptor) -> Self {
        SpecNode::Filter(descriptor)
    }

    /// Leaf that loads everything.
    pub fn pass() -> Self {
        SpecNode::Filter(FilterDescriptor::new())
    }

    pub fn group<I, S>(dimension: impl Into<String>, branches: I) -> Self
    where
        I: IntoIterator<Item = (S, SpecNode)>,
        S: Into<String>,
    {
        SpecNode::Group {
            dimension: dimension.into(),
            branches: branches.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Wrap as the single branch of a synthetic `<all>` group.
    pub fn wrap_all(self) -> Self {
        SpecNode::group(ALL, [(ALL, self)])
    }

    pub fn dimension(&self) -> Option<&str> {
        match self {
            SpecNode::Filter(_) => None,
            SpecNode::Group { dimension, .. } => Some(dimension),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            SpecNode::Filter(_) => 1,
            SpecNode::Group { branches, .. } => branches.values().map(SpecNode::leaf_count).sum(),
        }
    }

    /// Parse and validate a JSON load spec.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawNode =
            serde_json::from_str(text).map_err(|e| Error::InvalidLoadSpec(e.to_string()))?;
        Self::try_from(raw)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawNode =
            serde_json::from_value(value).map_err(|e| Error::InvalidLoadSpec(e.to_string()))?;
        Self::try_from(raw)
    }
}

/// Load spec exactly as written in JSON.
#[derive(Debug, Clone)]
pub struct RawNode {
    pub category: String,
    pub branches: RawBranches,
}

#[derive(Debug, Clone)]
pub enum RawBranches {
    Filter(RawFilter),
    Groups(IndexMap<String, RawNode>),
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawNodeVisitor;

        impl<'de> Visitor<'de> for RawNodeVisitor {
            type Value = RawNode;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [category, branches] pair")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<RawNode, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let category: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;

                // The category decides how the second element is read.
                let branches = if category == FILTER {
                    let filter: RawFilter = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                    RawBranches::Filter(filter)
                } else {
                    let groups: IndexMap<String, RawNode> = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                    RawBranches::Groups(groups)
                };

                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(3, &self));
                }

                Ok(RawNode { category, branches })
            }
        }

        deserializer.deserialize_seq(RawNodeVisitor)
    }
}

impl TryFrom<RawNode> for SpecNode {
    type Error = Error;

    fn try_from(raw: RawNode) -> Result<Self> {
        match raw.branches {
            RawBranches::Filter(filter) => Ok(SpecNode::Filter(FilterDescriptor::try_from(filter)?)),
            RawBranches::Groups(groups) => {
                if raw.category == INCLUDE || raw.category == EXCLUDE {
                    return Err(Error::InvalidLoadSpec(format!(
                        "'{}' is reserved for filters and cannot name a dimension",
                        raw.category
                    )));
                }
                let mut branches = IndexMap::with_capacity(groups.len());
                for (name, child) in groups {
                    branches.insert(name, SpecNode::try_from(child)?);
                }
                Ok(SpecNode::Group {
                    dimension: raw.category,
                    branches,
                })
            }
        }
    }
}

impl<'de> Deserialize<'de> for SpecNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawNode::deserialize(deserializer)?;
        SpecNode::try_from(raw).map_err(de::Error::custom)
    }
}
