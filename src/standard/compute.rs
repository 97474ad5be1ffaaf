//! Standard compute callbacks. Each returns a JSON object.

use crate::aggregate::{CallConfig, ConfigLookup};
use crate::diagnostics;
use crate::stats;
use crate::table::Table;

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde_json::{Value as Json, json};

pub const MEASURE: &str = "measure";
pub const GROUP_COLUMN: &str = "group_column";

const DEFAULT_ITERATIONS: u64 = 5000;
const DEFAULT_CI: f64 = 0.95;

pub fn count(config: &CallConfig, data: Table) -> anyhow::Result<Json> {
    Ok(json!({
        "rows": data.n_rows(),
        "groups": config.groups,
    }))
}

pub fn describe(config: &CallConfig, data: Table) -> anyhow::Result<Json> {
    let measure = measure_name(config)?;
    let xs = numeric_column(&data, &measure)?;
    Ok(json!({
        "measure": measure,
        "n": xs.len(),
        "mean": stats::mean(&xs),
        "sd": stats::std_dev(&xs),
    }))
}

pub fn cohens_d(config: &CallConfig, data: Table) -> anyhow::Result<Json> {
    let split = TwoGroups::split(config, &data)?;
    Ok(json!({
        "measure": split.measure,
        "group_column": split.column,
        "groups": [split.labels[0], split.labels[1]],
        "n": [split.samples[0].len(), split.samples[1].len()],
        "d": stats::cohens_d(&split.samples[0], &split.samples[1]),
    }))
}

pub fn bootstrap_mean(config: &CallConfig, data: Table) -> anyhow::Result<Json> {
    let measure = measure_name(config)?;
    let xs = numeric_column(&data, &measure)?;
    let n_bootstrap = config.get_u64("n_bootstrap").unwrap_or(DEFAULT_ITERATIONS);
    let ci = config.get_f64("ci").unwrap_or(DEFAULT_CI);
    let mut rng = stats::rng(config.get_u64("bootstrap_seed"));

    let interval = stats::bootstrap_ci(&xs, n_bootstrap as usize, ci, &mut rng, stats::mean);
    Ok(json!({
        "measure": measure,
        "n": xs.len(),
        "mean": stats::mean(&xs),
        "ci": ci,
        "ci_lower": interval.map(|(lo, _)| lo),
        "ci_upper": interval.map(|(_, hi)| hi),
        "n_bootstrap": n_bootstrap,
    }))
}

pub fn permutation_test(config: &CallConfig, data: Table) -> anyhow::Result<Json> {
    let split = TwoGroups::split(config, &data)?;
    let n_permutations = config
        .get_u64("n_permutations")
        .unwrap_or(DEFAULT_ITERATIONS);
    let mut rng = stats::rng(config.get_u64("permutation_seed"));

    let Some(test) = stats::permutation_test(
        &split.samples[0],
        &split.samples[1],
        n_permutations as usize,
        &mut rng,
    ) else {
        bail!(diagnostics::error_message(format!(
            "permutation test on '{}' needs observations in both groups",
            split.measure
        )));
    };

    Ok(json!({
        "measure": split.measure,
        "group_column": split.column,
        "groups": [split.labels[0], split.labels[1]],
        "observed": test.observed,
        "p_value": test.p_value,
        "n_permutations": n_permutations,
    }))
}

fn measure_name(config: &CallConfig) -> anyhow::Result<String> {
    config.get_str(MEASURE).with_context(|| {
        diagnostics::error_message(format!("compute needs a string '{}' option", MEASURE))
    })
}

/// Non-null numeric cells of `name`; any other cell is an error.
fn numeric_column(data: &Table, name: &str) -> anyhow::Result<Vec<f64>> {
    let cells = data.require_column(name)?;
    let mut out = Vec::with_capacity(cells.len());
    for (row, cell) in cells.iter().enumerate() {
        if cell.is_null() {
            continue;
        }
        match cell.as_f64() {
            Some(x) => out.push(x),
            None => bail!(diagnostics::error_message(format!(
                "column '{}' row {} is not numeric: {:?}",
                name, row, cell
            ))),
        }
    }
    Ok(out)
}

/// Measure values split by the two distinct values of a grouping column.
struct TwoGroups {
    measure: String,
    column: String,
    labels: [String; 2],
    samples: [Vec<f64>; 2],
}

impl TwoGroups {
    fn split(config: &CallConfig, data: &Table) -> anyhow::Result<Self> {
        let measure = measure_name(config)?;
        let column = match config.options.get(GROUP_COLUMN) {
            Some(Json::String(column)) => column.clone(),
            Some(other) => bail!(diagnostics::error_message(format!(
                "'{}' must be a string, got {}",
                GROUP_COLUMN, other
            ))),
            None => config.aggregate_over.first().cloned().with_context(|| {
                diagnostics::error_message(format!(
                    "no '{}' given and nothing aggregated over",
                    GROUP_COLUMN
                ))
            })?,
        };

        let keys = data.require_column(&column)?;
        let values = data.require_column(&measure)?;

        let mut groups: IndexMap<String, Vec<f64>> = IndexMap::new();
        for (key, value) in keys.iter().zip(values) {
            let Some(x) = value.as_f64() else {
                continue;
            };
            groups.entry(key.to_string()).or_default().push(x);
        }

        if groups.len() != 2 {
            bail!(diagnostics::error_message(format!(
                "'{}' must have exactly two groups, found {}: {}",
                column,
                groups.len(),
                groups.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }

        let mut it = groups.into_iter();
        let (Some((label_a, a)), Some((label_b, b))) = (it.next(), it.next()) else {
            bail!(diagnostics::error_message("group split lost a group"));
        };
        Ok(Self {
            measure,
            column,
            labels: [label_a, label_b],
            samples: [a, b],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use pretty_assertions::assert_eq;

    fn call_config(options: Json, aggregate_over: &[&str]) -> CallConfig {
        let Json::Object(options) = options else {
            panic!("expected object");
        };
        CallConfig {
            options,
            groups: [("story".to_string(), "carver".to_string())].into_iter().collect(),
            aggregate_over: aggregate_over.iter().map(|s| s.to_string()).collect(),
            aggregate_on: "story".to_string(),
            iteration: 0,
        }
    }

    fn ratings() -> Table {
        Table::from_columns([
            (
                "condition",
                ["intact", "intact", "intact", "scrambled", "scrambled", "scrambled"]
                    .into_iter()
                    .map(Value::from)
                    .collect::<Vec<_>>(),
            ),
            (
                "rating",
                [1_i64, 2, 3, 3, 4, 5].into_iter().map(Value::from).collect(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn count_reports_rows_and_groups() {
        let out = count(&call_config(json!({}), &[]), ratings()).unwrap();
        assert_eq!(out, json!({"rows": 6, "groups": {"story": "carver"}}));
    }

    #[test]
    fn describe_measure() {
        let out = describe(&call_config(json!({"measure": "rating"}), &[]), ratings()).unwrap();
        assert_eq!(out["n"], json!(6));
        assert_eq!(out["mean"], json!(3.0));
    }

    #[test]
    fn cohens_d_defaults_to_first_aggregated_dimension() {
        let config = call_config(json!({"measure": "rating"}), &["condition", "position"]);
        let out = cohens_d(&config, ratings()).unwrap();
        assert_eq!(out["groups"], json!(["intact", "scrambled"]));
        assert_eq!(out["d"], json!(-2.0));
    }

    #[test]
    fn two_groups_are_required() {
        let config = call_config(json!({"measure": "rating", "group_column": "rating"}), &[]);
        assert!(cohens_d(&config, ratings()).is_err());
    }

    #[test]
    fn seeded_bootstrap_is_stable() {
        let config = call_config(
            json!({"measure": "rating", "n_bootstrap": 200, "bootstrap_seed": 3}),
            &[],
        );
        let first = bootstrap_mean(&config, ratings()).unwrap();
        let second = bootstrap_mean(&config, ratings()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first["n_bootstrap"], json!(200));
    }

    #[test]
    fn permutation_between_conditions() {
        let config = call_config(
            json!({"measure": "rating", "n_permutations": 99, "permutation_seed": 5}),
            &["condition"],
        );
        let out = permutation_test(&config, ratings()).unwrap();
        assert_eq!(out["observed"], json!(-2.0));
        let p = out["p_value"].as_f64().unwrap();
        assert!(p > 0.0 && p <= 1.0);
    }
}
