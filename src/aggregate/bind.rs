//! Aggregation binding: load every leaf below an aggregation-dimension
//! branch, stamp provenance columns, concatenate, and hand the result to the
//! compute callback.

use crate::aggregate::callback::{CallFunc, LoadFunc};
use crate::aggregate::config::{CallConfig, ColumnConflict, LoadConfig, Options};
use crate::aggregate::resolve::{GroupVisitor, Resolution};
use crate::aggregate::ResultEntry;
use crate::spec::{FilterDescriptor, ResolvedSelector};
use crate::table::{Table, Value};
use crate::{Error, Result};

use indexmap::IndexMap;
use tracing::debug;

/// Index names normalised to the canonical participant id.
const RAW_ID: &str = "ID";
const PARTICIPANT_ID: &str = "participantID";

pub(crate) struct Binder<'a, R> {
    pub options: &'a Options,
    /// Filter rules taken from the base options; used per polarity where a leaf has none.
    pub base_filter: &'a FilterDescriptor,
    pub aggregate_on: &'a str,
    pub no_extra_columns: bool,
    pub column_conflict: ColumnConflict,
    pub load_func: &'a mut dyn LoadFunc,
    pub call_func: &'a mut dyn CallFunc<R>,
    /// Next value of `CallConfig::iteration`.
    pub iteration: usize,
    pub results: Vec<ResultEntry<R>>,
}

impl<R> GroupVisitor for Binder<'_, R> {
    type Error = Error;

    /// Every branch of the aggregation dimension is one compute call, nested
    /// ones included. A nested branch keeps the outer group's label, since
    /// the ancestor binding wins in `resolved_group`.
    fn visit_group(
        &mut self,
        dimension: &str,
        group: &str,
        resolved_group: &ResolvedSelector,
        subtree: &Resolution,
    ) -> Result<()> {
        if dimension != self.aggregate_on {
            return Ok(());
        }
        self.bind_group(dimension, group, resolved_group, subtree)
    }
}

impl<R> Binder<'_, R> {
    fn bind_group(
        &mut self,
        dimension: &str,
        group: &str,
        resolved_group: &ResolvedSelector,
        subtree: &Resolution,
    ) -> Result<()> {
        if subtree.is_empty() {
            return Err(Error::EmptyGroup {
                dimension: dimension.to_string(),
                group: group.to_string(),
            });
        }

        // Phase 1: one load per leaf, labelled with the leaf's bindings.
        let mut tables: Vec<Table> = Vec::with_capacity(subtree.len());
        let mut aggregate_over: Vec<String> = Vec::new();
        for (combined, isolated) in subtree.combined.iter().zip(&subtree.isolated) {
            let load_config = LoadConfig {
                options: self.options.clone(),
                selector: combined.with_filter(&combined.filter.or_defaults(self.base_filter)),
            };
            debug!(leaf = %combined.path_label(), "load");
            let mut table = self.load_func.load(&load_config).map_err(Error::Callback)?;

            if !self.no_extra_columns {
                stamp_groups(&mut table, &combined.groups, self.column_conflict)?;
            }

            for dim in isolated.groups.keys() {
                if dim != self.aggregate_on && !aggregate_over.contains(dim) {
                    aggregate_over.push(dim.clone());
                }
            }

            if table.index_name() == Some(RAW_ID) {
                table.set_index_name(Some(PARTICIPANT_ID.to_string()));
            }
            tables.push(table);
        }

        // Phase 2: one compute over the concatenation.
        let data = Table::concat(tables);
        let config = CallConfig {
            options: self.options.clone(),
            groups: resolved_group.groups.clone(),
            aggregate_over,
            aggregate_on: self.aggregate_on.to_string(),
            iteration: self.iteration,
        };
        self.iteration += 1;

        debug!(
            group = %resolved_group.path_label(),
            iteration = config.iteration,
            rows = data.n_rows(),
            "compute"
        );
        let result = self.call_func.call(&config, data).map_err(Error::Callback)?;
        self.results.push(ResultEntry { config, result });
        Ok(())
    }
}

/// Whether a loaded cell holds the same value as a selector label.
///
/// Numeric and boolean cells compare by value, so `1` agrees with "1.0".
fn agrees_with(cell: &Value, group: &str) -> bool {
    match cell {
        Value::Text(s) => s == group,
        Value::Bool(b) => group.parse::<bool>().is_ok_and(|g| g == *b),
        Value::Int(i) => match group.parse::<i64>() {
            Ok(g) => g == *i,
            Err(_) => group.parse::<f64>().is_ok_and(|g| g == *i as f64),
        },
        Value::Float(x) => group.parse::<f64>().is_ok_and(|g| g == *x),
        Value::Null | Value::Nested(_) => false,
    }
}

/// Add one constant column per dimension binding, root-most first at the front.
///
/// Columns the loaded table already has are left alone, or checked under
/// `ColumnConflict::Error`.
pub(crate) fn stamp_groups(
    table: &mut Table,
    groups: &IndexMap<String, String>,
    conflict: ColumnConflict,
) -> Result<()> {
    let mut position = 0;
    for (dimension, group) in groups {
        if let Some(existing) = table.column(dimension) {
            if conflict == ColumnConflict::Error && !existing.iter().all(|v| agrees_with(v, group)) {
                return Err(Error::ColumnConflict {
                    column: dimension.clone(),
                    expected: group.clone(),
                });
            }
            continue;
        }
        table.insert_constant(position, dimension.clone(), Value::Text(group.clone()))?;
        position += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn groups(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn stamps_in_root_first_order() {
        let mut table = Table::from_columns([("rating", vec![Value::Int(4)])]).unwrap();
        stamp_groups(
            &mut table,
            &groups(&[("story", "carver"), ("condition", "intact"), ("position", "post")]),
            ColumnConflict::Keep,
        )
        .unwrap();

        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["story", "condition", "position", "rating"]
        );
    }

    #[test]
    fn existing_columns_are_left_untouched() {
        let mut table = Table::from_columns([
            ("rating", vec![Value::Int(4), Value::Int(2)]),
            ("condition", vec![Value::from("intact"), Value::from("scrambled")]),
        ])
        .unwrap();
        stamp_groups(
            &mut table,
            &groups(&[("story", "carver"), ("condition", "intact")]),
            ColumnConflict::Keep,
        )
        .unwrap();

        assert_eq!(
            table.column("condition").unwrap().to_vec(),
            vec![Value::from("intact"), Value::from("scrambled")]
        );
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["story", "rating", "condition"]
        );
    }

    #[test]
    fn strict_conflicts_fail_on_disagreement() {
        let mut table = Table::from_columns([(
            "condition",
            vec![Value::from("intact"), Value::from("scrambled")],
        )])
        .unwrap();
        let err = stamp_groups(
            &mut table,
            &groups(&[("condition", "intact")]),
            ColumnConflict::Error,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ColumnConflict { column, .. } if column == "condition"));

        let mut agreeing = Table::from_columns([("condition", vec![Value::from("intact")])]).unwrap();
        assert!(
            stamp_groups(&mut agreeing, &groups(&[("condition", "intact")]), ColumnConflict::Error)
                .is_ok()
        );
    }

    #[test]
    fn strict_conflicts_compare_numbers_by_value() {
        let mut table = Table::from_columns([(
            "session",
            vec![Value::Float(1.0), Value::Int(1)],
        )])
        .unwrap();
        assert!(
            stamp_groups(&mut table, &groups(&[("session", "1.0")]), ColumnConflict::Error).is_ok()
        );
        assert!(
            stamp_groups(&mut table, &groups(&[("session", "1")]), ColumnConflict::Error).is_ok()
        );
        assert!(
            stamp_groups(&mut table, &groups(&[("session", "2")]), ColumnConflict::Error).is_err()
        );
    }
}
