use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::state::HealthState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input path: {0}")]
    InvalidInputPath(String),

    #[error("invalid input file: {0}")]
    InvalidInputFile(String),

    #[error("failed to read input")]
    InputReadFailure,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid JSON ({}) at line {}, column {}: {}", .0.category, .0.line, .0.column, .0.description)]
    InvalidJson(JsonError),

    /// A transient state whose outgoing rates sum to zero, or a row containing
    /// a negative, non-finite or self-targeting rate.
    #[error("malformed rate row for state {state}: {reason}")]
    MalformedRateRow { state: HealthState, reason: String },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("invalid transition table row for state {state}: {reason}")]
    InvalidTransitionRow { state: HealthState, reason: String },

    #[error("no input tables for group {0}")]
    UnknownGroup(String),

    #[error("no input tables for intervention {intervention} in group {group}")]
    UnknownIntervention { group: String, intervention: String },

    #[error("could not construct distribution: {0}")]
    Distribution(String),

    /// Entity outcomes that cannot come from a cohort of the stated size.
    #[error("inconsistent cohort outcome: {0}")]
    InconsistentOutcome(String),

    #[error("value does not fit in an SQLite integer: {0}")]
    IntegerOverflow(String),

    #[error("output file already exists: {0}")]
    OutputExists(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonError {
    pub description: String,
    pub category: String,
    pub line: usize,
    pub column: usize,
}

impl From<serde_json::error::Error> for Error {
    fn from(e: serde_json::error::Error) -> Self {
        Self::InvalidJson(JsonError {
            description: format!("{}", e),
            category: format!("{:?}", e.classify()),
            line: e.line(),
            column: e.column(),
        })
    }
}
