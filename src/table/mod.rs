//! Tabular data handed from load callbacks to compute callbacks.

pub mod frame;
pub mod value;

pub use frame::{Record, Table};
pub use value::Value;
