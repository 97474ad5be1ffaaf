//! Spec layer: the declarative load spec and its validated in-memory form.
//!
//! This module owns:
//! - SpecNode (grouping tree with filter leaves)
//! - FilterDescriptor and its predicates
//! - ResolvedSelector (one flattened path through the tree)

pub mod filter;
pub mod node;
pub mod selector;

pub use filter::{FilterDescriptor, FilterValue, Operator, Predicate};
pub use node::{ALL, FILTER, SpecNode};
pub use selector::ResolvedSelector;
