//! Aggregation driver.
//!
//! A run pops its reserved keys out of the caller's config, resolves the load
//! spec depth-first, and at every branch of the aggregation dimension loads
//! each leaf below it, concatenates the tables, and calls the compute
//! callback once. Results come back in traversal order.

mod bind;
pub mod callback;
pub mod config;
pub mod resolve;

pub use callback::{CallFunc, Cached, LoadFunc, Registry};
pub use config::{
    CallConfig, ColumnConflict, ConfigLookup, LoadConfig, Options, UnaggregatedLeaves,
};
pub use resolve::{GroupVisitor, Resolution, resolve, resolve_with, unaggregated_leaves};

use crate::diagnostics;
use crate::spec::filter::{EXCLUDE, INCLUDE};
use crate::spec::{ALL, FilterDescriptor, ResolvedSelector, SpecNode};
use crate::{Error, Result};

use bind::Binder;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::info;

/// One compute call: the configuration it saw and what it returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry<R> {
    pub config: CallConfig,
    pub result: R,
}

/// Builder for one aggregation run.
///
/// Every setting may also come from the config mapping; config keys win
/// over builder calls and are removed before the remaining options are
/// forwarded to callbacks.
pub struct Aggregator<'a, R> {
    config: Options,
    load_spec: Option<SpecNode>,
    load_func: Option<Box<dyn LoadFunc + 'a>>,
    call_func: Option<Box<dyn CallFunc<R> + 'a>>,
    aggregate_on: Option<String>,
    no_extra_columns: Option<bool>,
    unaggregated_leaves: Option<UnaggregatedLeaves>,
    column_conflict: Option<ColumnConflict>,
    registry: Option<&'a Registry<R>>,
}

impl<'a, R> Aggregator<'a, R> {
    pub fn new(config: Options) -> Self {
        Self {
            config,
            load_spec: None,
            load_func: None,
            call_func: None,
            aggregate_on: None,
            no_extra_columns: None,
            unaggregated_leaves: None,
            column_conflict: None,
            registry: None,
        }
    }

    pub fn load_spec(mut self, spec: SpecNode) -> Self {
        self.load_spec = Some(spec);
        self
    }

    pub fn load_func(mut self, f: impl LoadFunc + 'a) -> Self {
        self.load_func = Some(Box::new(f));
        self
    }

    pub fn call_func(mut self, f: impl CallFunc<R> + 'a) -> Self {
        self.call_func = Some(Box::new(f));
        self
    }

    pub fn aggregate_on(mut self, dimension: impl Into<String>) -> Self {
        self.aggregate_on = Some(dimension.into());
        self
    }

    pub fn no_extra_columns(mut self, yes: bool) -> Self {
        self.no_extra_columns = Some(yes);
        self
    }

    pub fn unaggregated_leaves(mut self, policy: UnaggregatedLeaves) -> Self {
        self.unaggregated_leaves = Some(policy);
        self
    }

    pub fn column_conflict(mut self, policy: ColumnConflict) -> Self {
        self.column_conflict = Some(policy);
        self
    }

    /// Where `load_func` / `call_func` names found in the config are looked up.
    pub fn registry(mut self, registry: &'a Registry<R>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn run(self) -> Result<Vec<ResultEntry<R>>> {
        let mut options = self.config;

        // Phase 1: reserved keys.
        let load_spec = match options.shift_remove(config::LOAD_SPEC) {
            Some(value) => SpecNode::from_value(value)?,
            None => self.load_spec.ok_or_else(|| missing(config::LOAD_SPEC))?,
        };

        let mut load_func: Box<dyn LoadFunc + 'a> = match options.shift_remove(config::LOAD_FUNC) {
            Some(value) => {
                let name = expect_str(config::LOAD_FUNC, value)?;
                lookup(self.registry, "load_func", &name, |r| r.loader(&name))?
            }
            None => self.load_func.ok_or_else(|| missing(config::LOAD_FUNC))?,
        };

        let mut call_func: Box<dyn CallFunc<R> + 'a> = match options.shift_remove(config::CALL_FUNC)
        {
            Some(value) => {
                let name = expect_str(config::CALL_FUNC, value)?;
                lookup(self.registry, "call_func", &name, |r| r.compute(&name))?
            }
            None => self.call_func.ok_or_else(|| missing(config::CALL_FUNC))?,
        };

        let aggregate_on = match options.shift_remove(config::AGGREGATE_ON) {
            Some(Json::Null) => None,
            Some(value) => Some(expect_str(config::AGGREGATE_ON, value)?),
            None => self.aggregate_on,
        };

        let no_extra_columns = match options.shift_remove(config::NO_EXTRA_COLUMNS) {
            Some(value) => expect_bool(config::NO_EXTRA_COLUMNS, value)?,
            None => self.no_extra_columns.unwrap_or(false),
        };

        let leaves_policy = match options.shift_remove(config::UNAGGREGATED_LEAVES) {
            Some(value) => expect_str(config::UNAGGREGATED_LEAVES, value)?.parse()?,
            None => self.unaggregated_leaves.unwrap_or_default(),
        };

        let column_conflict = match options.shift_remove(config::COLUMN_CONFLICT) {
            Some(value) => expect_str(config::COLUMN_CONFLICT, value)?.parse()?,
            None => self.column_conflict.unwrap_or_default(),
        };

        // Base include/exclude act as the default filter of every leaf.
        let base_filter = FilterDescriptor::from_mapping(&options)?;
        options.shift_remove(INCLUDE);
        options.shift_remove(EXCLUDE);

        // Phase 2: the degenerate "everything in one group" mode.
        let (spec, aggregate_on) = match aggregate_on {
            Some(dimension) => (load_spec, dimension),
            None => (load_spec.wrap_all(), ALL.to_string()),
        };

        // Phase 3: leaves the walk would never reach.
        let dropped = unaggregated_leaves(&spec, &aggregate_on);
        if !dropped.is_empty() {
            let leaves: Vec<String> = dropped.iter().map(ResolvedSelector::path_label).collect();
            match leaves_policy {
                UnaggregatedLeaves::Skip => {}
                UnaggregatedLeaves::Warn => diagnostics::warn(format!(
                    "{} filter leaves have no '{}' ancestor and will not be loaded: {}",
                    leaves.len(),
                    aggregate_on,
                    leaves.join("; ")
                )),
                UnaggregatedLeaves::Error => {
                    return Err(Error::UnaggregatedLeaves {
                        aggregate_on,
                        leaves,
                    });
                }
            }
        }

        info!(
            aggregate_on = %aggregate_on,
            leaves = spec.leaf_count(),
            "aggregation run"
        );

        // Phase 4: walk.
        let mut binder = Binder {
            options: &options,
            base_filter: &base_filter,
            aggregate_on: &aggregate_on,
            no_extra_columns,
            column_conflict,
            load_func: load_func.as_mut(),
            call_func: call_func.as_mut(),
            iteration: 0,
            results: Vec::new(),
        };
        resolve_with(&spec, &ResolvedSelector::new(), &mut binder)?;

        info!(results = binder.results.len(), "aggregation done");
        Ok(binder.results)
    }
}

/// Run a fully config-driven aggregation with callbacks named in `registry`.
pub fn aggregate<R>(config: Options, registry: &Registry<R>) -> Result<Vec<ResultEntry<R>>> {
    Aggregator::new(config).registry(registry).run()
}

fn missing(name: &str) -> Error {
    Error::MissingArgument {
        name: name.to_string(),
    }
}

fn lookup<'a, R, T>(
    registry: Option<&'a Registry<R>>,
    kind: &'static str,
    name: &str,
    get: impl FnOnce(&'a Registry<R>) -> Result<T>,
) -> Result<T> {
    match registry {
        Some(registry) => get(registry),
        None => Err(Error::UnknownCallback {
            kind,
            name: name.to_string(),
        }),
    }
}

fn expect_str(key: &str, value: Json) -> Result<String> {
    match value {
        Json::String(s) => Ok(s),
        other => Err(Error::InvalidLoadSpec(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
    }
}

fn expect_bool(key: &str, value: Json) -> Result<bool> {
    match value {
        Json::Bool(b) => Ok(b),
        other => Err(Error::InvalidLoadSpec(format!(
            "'{}' must be a boolean, got {}",
            key, other
        ))),
    }
}
