//! `records` loader: one JSON file of row objects per resolved leaf.
//!
//! Options read:
//! - `data_path` (required): path template, `{name}` is replaced by the
//!   selector's binding for `name`, or else a string option of that name
//! - `index_column`: column moved out to become the row index
//! - `auto_exclude`: drop rows flagged in the `exclusion` column first
//! - `keep_filter_columns` / `remove_filter_columns`: lists of column names;
//!   only (or all but) the selector predicates on those columns are applied

use crate::aggregate::{ConfigLookup, LoadConfig};
use crate::diagnostics;
use crate::filter;
use crate::spec::FilterDescriptor;
use crate::table::{Record, Table};

use anyhow::{Context, bail};
use regex::{Captures, Regex};

pub const DATA_PATH: &str = "data_path";
pub const INDEX_COLUMN: &str = "index_column";
pub const AUTO_EXCLUDE: &str = "auto_exclude";
pub const KEEP_FILTER_COLUMNS: &str = "keep_filter_columns";
pub const REMOVE_FILTER_COLUMNS: &str = "remove_filter_columns";

const PLACEHOLDER_RE: &str = r"\{([^{}]+)\}";

/// Substitute every `{name}` in `template` from the config.
pub fn expand_path(template: &str, config: &impl ConfigLookup) -> anyhow::Result<String> {
    let re = Regex::new(PLACEHOLDER_RE)?;
    let mut missing = Vec::new();
    let expanded = re.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        match config.get_str(name) {
            Some(value) => value,
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });
    if !missing.is_empty() {
        bail!(diagnostics::error_message(format!(
            "{} '{}' references unknown key(s): {}",
            DATA_PATH,
            template,
            missing.join(", ")
        )));
    }
    Ok(expanded.into_owned())
}

/// A list-of-strings option, if present.
fn column_list(config: &LoadConfig, key: &str) -> anyhow::Result<Option<Vec<String>>> {
    let Some(value) = config.options.get(key) else {
        return Ok(None);
    };
    let names = value.as_array().and_then(|items| {
        items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
    });
    match names {
        Some(names) => Ok(Some(names)),
        None => bail!(diagnostics::error_message(format!(
            "'{}' must be a list of column names, got {}",
            key, value
        ))),
    }
}

/// The selector filter narrowed by the filter-column options.
fn effective_filter(config: &LoadConfig) -> anyhow::Result<FilterDescriptor> {
    let mut filter = config.selector.filter.clone();
    if let Some(keep) = column_list(config, KEEP_FILTER_COLUMNS)? {
        let keep: Vec<&str> = keep.iter().map(String::as_str).collect();
        filter = filter.keep_columns(&keep);
    }
    if let Some(remove) = column_list(config, REMOVE_FILTER_COLUMNS)? {
        let remove: Vec<&str> = remove.iter().map(String::as_str).collect();
        filter = filter.remove_columns(&remove);
    }
    Ok(filter)
}

pub fn load_records(config: &LoadConfig) -> anyhow::Result<Table> {
    let Some(template) = config.get_str(DATA_PATH) else {
        bail!(diagnostics::error_message(format!(
            "records loader needs a string '{}' option",
            DATA_PATH
        )));
    };
    let path = expand_path(&template, config)?;

    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let records: Vec<Record> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path))?;

    let index_column = config.get_str(INDEX_COLUMN);
    let mut table = Table::from_records(records, index_column.as_deref())?;

    if config.get_bool(AUTO_EXCLUDE).unwrap_or(false) {
        if !table.has_column(filter::EXCLUSION_COLUMN) {
            bail!(diagnostics::error_message(format!(
                "{} is set but {} has no '{}' column",
                AUTO_EXCLUDE,
                path,
                filter::EXCLUSION_COLUMN
            )));
        }
        table = filter::drop_flagged(&table)?;
    }
    let table = filter::apply(&table, &effective_filter(config)?)?;

    tracing::debug!(path = %path, rows = table.n_rows(), "records loaded");
    Ok(table)
}
