//! Built-in callbacks reachable by name from a JSON run config.

pub mod compute;
pub mod records;

use crate::aggregate::{Cached, Registry};

use serde_json::Value as Json;

impl Registry<Json> {
    /// Loader `records` (memoised per run) plus computes `count`, `describe`, `cohens_d`,
    /// `bootstrap_mean` and `permutation_test`.
    pub fn standard() -> Self {
        let mut registry = Registry::new();
        registry
            .register_loader("records", || Box::new(Cached::new(records::load_records)))
            .register_compute("count", || Box::new(compute::count))
            .register_compute("describe", || Box::new(compute::describe))
            .register_compute("cohens_d", || Box::new(compute::cohens_d))
            .register_compute("bootstrap_mean", || Box::new(compute::bootstrap_mean))
            .register_compute("permutation_test", || Box::new(compute::permutation_test));
        registry
    }
}
