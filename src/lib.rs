//! Hierarchical load-spec aggregation.
//!
//! A load spec is a tree of grouping dimensions ending in filter leaves.
//! Aggregation resolves every root-to-leaf path, loads a table per leaf
//! through an injected loader, and at each branch of the chosen aggregation
//! dimension concatenates the leaf tables and hands them to an injected
//! compute callback.

pub mod aggregate;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod spec;
pub mod standard;
pub mod stats;
pub mod table;

pub use aggregate::{
    Aggregator, CallConfig, LoadConfig, Options, Registry, ResultEntry, aggregate,
};
pub use error::{Error, Result};
pub use spec::{FilterDescriptor, ResolvedSelector, SpecNode};
pub use table::{Table, Value};
