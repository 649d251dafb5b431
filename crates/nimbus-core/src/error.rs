//! Error types for Nimbus Core

use thiserror::Error;

/// Query translation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The translator met an expression shape it cannot express as a query
    #[error("Unsupported query expression: {0}")]
    Unsupported(String),

    /// A date-part argument is out of range or missing
    #[error("Invalid date part: {0}")]
    InvalidDatePart(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
