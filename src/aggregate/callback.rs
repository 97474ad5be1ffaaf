//! Injected load/compute callbacks and the name registry used by configs.

use crate::aggregate::config::{CallConfig, LoadConfig};
use crate::table::Table;
use crate::{Error, Result};

use indexmap::IndexMap;
use std::collections::HashMap;

/// Turns one resolved load configuration into a table.
pub trait LoadFunc {
    fn load(&mut self, config: &LoadConfig) -> anyhow::Result<Table>;
}

impl<F> LoadFunc for F
where
    F: FnMut(&LoadConfig) -> anyhow::Result<Table>,
{
    fn load(&mut self, config: &LoadConfig) -> anyhow::Result<Table> {
        self(config)
    }
}

/// Computes a result from the combined table of one aggregation group.
pub trait CallFunc<R> {
    fn call(&mut self, config: &CallConfig, data: Table) -> anyhow::Result<R>;
}

impl<R, F> CallFunc<R> for F
where
    F: FnMut(&CallConfig, Table) -> anyhow::Result<R>,
{
    fn call(&mut self, config: &CallConfig, data: Table) -> anyhow::Result<R> {
        self(config, data)
    }
}

/// Memoises an inner loader by the full flattened load configuration.
pub struct Cached<L> {
    inner: L,
    cache: HashMap<String, Table>,
}

impl<L: LoadFunc> Cached<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
        }
    }
}

impl<L: LoadFunc> LoadFunc for Cached<L> {
    fn load(&mut self, config: &LoadConfig) -> anyhow::Result<Table> {
        let key = serde_json::to_string(config)?;
        if let Some(table) = self.cache.get(&key) {
            tracing::debug!(key = %key, "load cache hit");
            return Ok(table.clone());
        }
        let table = self.inner.load(config)?;
        self.cache.insert(key, table.clone());
        Ok(table)
    }
}

type LoaderFactory = Box<dyn Fn() -> Box<dyn LoadFunc>>;
type ComputeFactory<R> = Box<dyn Fn() -> Box<dyn CallFunc<R>>>;

/// Named callbacks, so a JSON config can say `"load_func": "records"`.
///
/// Factories hand out a fresh instance per run.
pub struct Registry<R> {
    loaders: IndexMap<String, LoaderFactory>,
    computes: IndexMap<String, ComputeFactory<R>>,
}

impl<R> Default for Registry<R> {
    fn default() -> Self {
        Self {
            loaders: IndexMap::new(),
            computes: IndexMap::new(),
        }
    }
}

impl<R> Registry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_loader<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn LoadFunc> + 'static,
    {
        self.loaders.insert(name.into(), Box::new(factory));
        self
    }

    pub fn register_compute<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn CallFunc<R>> + 'static,
    {
        self.computes.insert(name.into(), Box::new(factory));
        self
    }

    pub fn loader(&self, name: &str) -> Result<Box<dyn LoadFunc>> {
        self.loaders
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownCallback {
                kind: "load_func",
                name: name.to_string(),
            })
    }

    pub fn compute(&self, name: &str) -> Result<Box<dyn CallFunc<R>>> {
        self.computes
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownCallback {
                kind: "call_func",
                name: name.to_string(),
            })
    }

    pub fn loader_names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    pub fn compute_names(&self) -> impl Iterator<Item = &str> {
        self.computes.keys().map(String::as_str)
    }
}
