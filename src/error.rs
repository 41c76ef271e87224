//! Error taxonomy shared by every `hfe` tool.
//!
//! Nothing here is retried. A batch run either finishes its pass or stops at
//! the first error, and re-running is the recovery mechanism.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input data: a bad numeric field, a bad `index:value`
    /// token or a row that is too short for the schema.
    #[error("parse error on line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Invalid configuration, always raised before any row is read.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn parse(line: u64, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}
