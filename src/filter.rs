//! Filter evaluation over loaded tables.
//!
//! Within one polarity every predicate must hold. A row survives when it
//! passes the include group and does not pass the exclude group; an absent
//! group filters nothing.

use crate::spec::{FilterDescriptor, FilterValue, Operator, Predicate};
use crate::table::{Table, Value};
use crate::{Error, Result};

use regex::Regex;
use std::cmp::Ordering;

/// Column and value the loaders use to flag excluded participants.
pub const EXCLUSION_COLUMN: &str = "exclusion";
pub const EXCLUDED: &str = "excluded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}

/// Apply a whole descriptor.
pub fn apply(table: &Table, filter: &FilterDescriptor) -> Result<Table> {
    if filter.is_empty() {
        return Ok(table.clone());
    }

    let n = table.n_rows();
    let included = if filter.include.is_empty() {
        vec![true; n]
    } else {
        conjunction(table, &filter.include)?
    };
    let excluded = if filter.exclude.is_empty() {
        vec![false; n]
    } else {
        conjunction(table, &filter.exclude)?
    };

    let keep: Vec<bool> = included
        .iter()
        .zip(&excluded)
        .map(|(inc, exc)| *inc && !*exc)
        .collect();
    Ok(table.select(&keep))
}

/// Apply one polarity group on its own.
pub fn select(table: &Table, predicates: &[Predicate], polarity: Polarity) -> Result<Table> {
    if predicates.is_empty() {
        return Ok(table.clone());
    }
    let mut mask = conjunction(table, predicates)?;
    if polarity == Polarity::Exclude {
        mask.iter_mut().for_each(|m| *m = !*m);
    }
    Ok(table.select(&mask))
}

/// Rows satisfying every predicate.
pub fn conjunction(table: &Table, predicates: &[Predicate]) -> Result<Vec<bool>> {
    let mut mask = vec![true; table.n_rows()];
    for predicate in predicates {
        let current = evaluate(table, predicate)?;
        for (m, c) in mask.iter_mut().zip(current) {
            *m = *m && c;
        }
    }
    Ok(mask)
}

/// Per-row truth of a single predicate.
pub fn evaluate(table: &Table, predicate: &Predicate) -> Result<Vec<bool>> {
    let cells = table.require_column(predicate.column())?;
    let value = predicate.value();

    match predicate.op() {
        Operator::Match => Ok(cells.iter().map(|c| matches_value(c, value)).collect()),
        Operator::Contains => {
            let pattern = match value {
                FilterValue::Text(p) => p,
                other => {
                    return Err(Error::InvalidFilterSpec(format!(
                        "contains requires a text value, got {}",
                        other
                    )));
                }
            };
            let re = Regex::new(pattern)
                .map_err(|e| Error::InvalidFilterSpec(format!("bad regex {:?}: {}", pattern, e)))?;
            Ok(cells
                .iter()
                .map(|c| c.as_str().is_some_and(|s| re.is_match(s)))
                .collect())
        }
        op => Ok(cells
            .iter()
            .map(|c| match compare(c, value) {
                Some(ord) => ordering_holds(op, ord),
                None => false,
            })
            .collect()),
    }
}

/// Drop rows flagged in the exclusion column, then drop the column.
pub fn drop_flagged(table: &Table) -> Result<Table> {
    let flagged = Predicate::new(Operator::Match, EXCLUSION_COLUMN, EXCLUDED)?;
    let mut out = select(table, &[flagged], Polarity::Exclude)?;
    out.drop_column(EXCLUSION_COLUMN);
    Ok(out)
}

fn matches_value(cell: &Value, value: &FilterValue) -> bool {
    match (cell, value) {
        (Value::Text(s), FilterValue::Text(v)) => s == v,
        (Value::Bool(b), FilterValue::Bool(v)) => b == v,
        _ if value.is_numeric() => compare_numbers(cell, value) == Some(Ordering::Equal),
        _ => false,
    }
}

/// Ordering of cell relative to value; only like kinds compare.
fn compare(cell: &Value, value: &FilterValue) -> Option<Ordering> {
    match value {
        FilterValue::Int(_) | FilterValue::Float(_) => compare_numbers(cell, value),
        FilterValue::Text(v) => Some(cell.as_str()?.cmp(v.as_str())),
        FilterValue::Bool(_) => None,
    }
}

/// Integers compare exactly; a float on either side compares as f64.
fn compare_numbers(cell: &Value, value: &FilterValue) -> Option<Ordering> {
    match (cell, value) {
        (Value::Int(a), FilterValue::Int(b)) => Some(a.cmp(b)),
        (_, FilterValue::Int(b)) => cell.as_f64()?.partial_cmp(&(*b as f64)),
        (_, FilterValue::Float(b)) => cell.as_f64()?.partial_cmp(b),
        _ => None,
    }
}

fn ordering_holds(op: Operator, ord: Ordering) -> bool {
    match op {
        Operator::Gt => ord == Ordering::Greater,
        Operator::Gte => ord != Ordering::Less,
        Operator::Lt => ord == Ordering::Less,
        Operator::Lte => ord != Ordering::Greater,
        Operator::Match | Operator::Contains => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn xs(values: &[i64]) -> Table {
        Table::from_columns([("x", values.iter().map(|v| Value::Int(*v)).collect::<Vec<_>>())]).unwrap()
    }

    fn column_ints(table: &Table, name: &str) -> Vec<i64> {
        table
            .column(name)
            .unwrap()
            .iter()
            .map(|v| match v {
                Value::Int(i) => *i,
                other => panic!("not an int: {:?}", other),
            })
            .collect()
    }

    fn pred(op: Operator, column: &str, value: impl Into<FilterValue>) -> Predicate {
        Predicate::new(op, column, value).unwrap()
    }

    #[test]
    fn include_and_exclude_gte() {
        let table = xs(&[1, 2, 3]);

        let inc = FilterDescriptor::new().include(pred(Operator::Gte, "x", 2_i64));
        assert_eq!(column_ints(&apply(&table, &inc).unwrap(), "x"), vec![2, 3]);

        let exc = FilterDescriptor::new().exclude(pred(Operator::Gte, "x", 2_i64));
        assert_eq!(column_ints(&apply(&table, &exc).unwrap(), "x"), vec![1]);
    }

    #[test]
    fn empty_descriptor_passes_everything() {
        let table = xs(&[1, 2, 3]);
        assert_eq!(apply(&table, &FilterDescriptor::new()).unwrap(), table);
    }

    #[test]
    fn exclude_wins_over_include() {
        let table = xs(&[1, 2, 3, 4]);
        let filter = FilterDescriptor::new()
            .include(pred(Operator::Gt, "x", 1_i64))
            .exclude(pred(Operator::Match, "x", 3_i64));
        assert_eq!(column_ints(&apply(&table, &filter).unwrap(), "x"), vec![2, 4]);
    }

    #[test]
    fn predicates_within_a_group_are_conjoined() {
        let table = xs(&[1, 2, 3, 4, 5]);
        let filter = FilterDescriptor::new()
            .include(pred(Operator::Gte, "x", 2_i64))
            .include(pred(Operator::Lt, "x", 4_i64));
        assert_eq!(column_ints(&apply(&table, &filter).unwrap(), "x"), vec![2, 3]);

        let filter = FilterDescriptor::new()
            .exclude(pred(Operator::Gte, "x", 2_i64))
            .exclude(pred(Operator::Lte, "x", 3_i64));
        assert_eq!(column_ints(&apply(&table, &filter).unwrap(), "x"), vec![1, 4, 5]);
    }

    #[test]
    fn contains_is_a_case_sensitive_regex() {
        let table = Table::from_columns([(
            "word",
            vec![
                Value::from("Lamp"),
                Value::from("lamppost"),
                Value::from("clamp"),
                Value::Int(7),
            ],
        )])
        .unwrap();
        let filter = FilterDescriptor::new().include(pred(Operator::Contains, "word", "^lamp"));
        let out = apply(&table, &filter).unwrap();
        assert_eq!(out.column("word").unwrap().to_vec(), vec![Value::from("lamppost")]);
    }

    #[test]
    fn match_compares_like_kinds() {
        let table = Table::from_columns([(
            "volition",
            vec![Value::from("intentional"), Value::from("1"), Value::Null],
        )])
        .unwrap();
        let filter = FilterDescriptor::new().include(pred(Operator::Match, "volition", "intentional"));
        assert_eq!(apply(&table, &filter).unwrap().n_rows(), 1);

        let numeric = FilterDescriptor::new().include(pred(Operator::Match, "volition", 1_i64));
        assert_eq!(apply(&table, &numeric).unwrap().n_rows(), 0);
    }

    #[test]
    fn large_integer_ids_compare_exactly() {
        let big = 9_007_199_254_740_993_i64;
        let table = xs(&[big - 1, big, big + 1]);

        let filter = FilterDescriptor::new().include(pred(Operator::Match, "x", big));
        assert_eq!(column_ints(&apply(&table, &filter).unwrap(), "x"), vec![big]);

        let filter = FilterDescriptor::new().include(pred(Operator::Gt, "x", big));
        assert_eq!(column_ints(&apply(&table, &filter).unwrap(), "x"), vec![big + 1]);
    }

    #[test]
    fn ints_and_floats_compare_across_kinds() {
        let table = Table::from_columns([(
            "word_time",
            vec![Value::Int(2), Value::Float(2.5), Value::Float(3.0)],
        )])
        .unwrap();
        let filter = FilterDescriptor::new().include(pred(Operator::Gte, "word_time", 2.5_f64));
        assert_eq!(apply(&table, &filter).unwrap().n_rows(), 2);

        let filter = FilterDescriptor::new().include(pred(Operator::Match, "word_time", 3_i64));
        assert_eq!(
            apply(&table, &filter).unwrap().column("word_time").unwrap().to_vec(),
            vec![Value::Float(3.0)]
        );
    }

    #[test]
    fn missing_column_is_reported() {
        let filter = FilterDescriptor::new().include(pred(Operator::Match, "age", 30_i64));
        let err = apply(&xs(&[1]), &filter).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(c) if c == "age"));
    }

    #[test]
    fn flagged_rows_and_column_are_dropped() {
        let table = Table::from_columns([
            ("x", vec![Value::Int(1), Value::Int(2)]),
            (EXCLUSION_COLUMN, vec![Value::from(EXCLUDED), Value::from("")]),
        ])
        .unwrap();
        let out = drop_flagged(&table).unwrap();
        assert_eq!(column_ints(&out, "x"), vec![2]);
        assert!(!out.has_column(EXCLUSION_COLUMN));
    }

    #[test]
    fn single_polarity_select() {
        let table = xs(&[1, 2, 3]);
        let preds = [pred(Operator::Lt, "x", 3_i64)];
        assert_eq!(
            column_ints(&select(&table, &preds, Polarity::Include).unwrap(), "x"),
            vec![1, 2]
        );
        assert_eq!(
            column_ints(&select(&table, &preds, Polarity::Exclude).unwrap(), "x"),
            vec![3]
        );
    }
}
