//! Resolved selectors: one root-to-leaf path through a load spec.

use crate::spec::filter::{EXCLUDE, FilterDescriptor, INCLUDE};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Dimension bindings plus the filter of the leaf the path ends in.
///
/// `groups` is ordered root-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSelector {
    pub groups: IndexMap<String, String>,
    pub filter: FilterDescriptor,
}

impl ResolvedSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_filter(filter: &FilterDescriptor) -> Self {
        Self {
            groups: IndexMap::new(),
            filter: filter.clone(),
        }
    }

    /// Copy with `dimension = group` appended. An existing binding of the
    /// same dimension (from an ancestor) is kept.
    pub fn bind(&self, dimension: &str, group: &str) -> Self {
        let mut out = self.clone();
        out.groups
            .entry(dimension.to_string())
            .or_insert_with(|| group.to_string());
        out
    }

    /// Copy with `dimension = group` placed in front. Bindings already in
    /// this selector come from deeper in the tree and win on conflict.
    pub fn prefixed(&self, dimension: &str, group: &str) -> Self {
        let mut groups = IndexMap::with_capacity(self.groups.len() + 1);
        groups.insert(dimension.to_string(), group.to_string());
        for (k, v) in &self.groups {
            groups.insert(k.clone(), v.clone());
        }
        Self {
            groups,
            filter: self.filter.clone(),
        }
    }

    pub fn with_filter(&self, filter: &FilterDescriptor) -> Self {
        Self {
            groups: self.groups.clone(),
            filter: filter.clone(),
        }
    }

    pub fn group(&self, dimension: &str) -> Option<&str> {
        self.groups.get(dimension).map(String::as_str)
    }

    /// Human-readable path, e.g. `story=carver/condition=intact`.
    pub fn path_label(&self) -> String {
        if self.groups.is_empty() {
            return "<root>".to_string();
        }
        self.groups
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Flat mapping: filter keys first, then dimension bindings.
    pub fn to_mapping(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut out = serde_json::Map::new();
        if !self.filter.include.is_empty() {
            out.insert(
                INCLUDE.to_string(),
                serde_json::to_value(&self.filter.include).unwrap_or_default(),
            );
        }
        if !self.filter.exclude.is_empty() {
            out.insert(
                EXCLUDE.to_string(),
                serde_json::to_value(&self.filter.exclude).unwrap_or_default(),
            );
        }
        for (k, v) in &self.groups {
            out.insert(k.clone(), serde_json::Value::String(v.clone()));
        }
        out
    }
}

impl Serialize for ResolvedSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_mapping().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::filter::{Operator, Predicate};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn bind_keeps_ancestor_binding() {
        let sel = ResolvedSelector::new()
            .bind("story", "carver")
            .bind("condition", "intact")
            .bind("story", "july");

        assert_eq!(sel.group("story"), Some("carver"));
        assert_eq!(sel.path_label(), "story=carver/condition=intact");
    }

    #[test]
    fn prefixed_lets_inner_binding_win() {
        let inner = ResolvedSelector::new().bind("position", "post");
        let sel = inner.prefixed("condition", "intact").prefixed("position", "pre");

        assert_eq!(sel.group("position"), Some("post"));
        assert_eq!(
            sel.groups.keys().collect::<Vec<_>>(),
            vec!["position", "condition"]
        );
    }

    #[test]
    fn mapping_flattens_filter_and_groups() {
        let filter = FilterDescriptor::new()
            .include(Predicate::new(Operator::Match, "volition", "intentional").unwrap());
        let sel = ResolvedSelector::new()
            .bind("story", "carver")
            .with_filter(&filter);

        assert_eq!(
            serde_json::to_value(&sel).unwrap(),
            json!({
                "include": [["match", "volition", "intentional"]],
                "story": "carver"
            })
        );
    }
}
