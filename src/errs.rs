//! Crate-wide typed error taxonomy.

use thiserror::Error;

pub type CnResult<T> = Result<T, CnError>;

#[derive(Error, Debug)]
pub enum CnError {
    #[error("usage error: {0}")]
    UsageError(String),

    #[error("parameter error: {0}")]
    ParameterError(String),

    #[error("input stream was not ready in time")]
    InputNotReady,

    #[error("failed to parse line {line}: {reason}")]
    LineParseError { line: usize, reason: String },

    #[error("too many malformed input lines ({count}), aborting")]
    TooManyLineParseErrors { count: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
