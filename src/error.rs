use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Argument {name} not in config and not supplied")]
    MissingArgument { name: String },

    #[error("Invalid filter spec: {0}")]
    InvalidFilterSpec(String),

    #[error("Unknown filter operator: {0}")]
    InvalidOperator(String),

    #[error("Data does not contain column {0}")]
    ColumnNotFound(String),

    #[error("Table shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid load spec: {0}")]
    InvalidLoadSpec(String),

    #[error("{} filter leaves have no '{aggregate_on}' ancestor: {}", leaves.len(), leaves.join("; "))]
    UnaggregatedLeaves {
        aggregate_on: String,
        leaves: Vec<String>,
    },

    #[error("Loaded column '{column}' disagrees with selector value '{expected}'")]
    ColumnConflict { column: String, expected: String },

    #[error("Group {dimension}={group} contains no filter leaf to load")]
    EmptyGroup { dimension: String, group: String },

    #[error("No {kind} registered under '{name}'")]
    UnknownCallback { kind: &'static str, name: String },

    /// Raised inside a load or compute callback; passed through untouched.
    #[error(transparent)]
    Callback(anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
