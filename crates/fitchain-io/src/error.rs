use fitchain_core::MlError;
use thiserror::Error;

/// Errors raised while loading datasets from disk.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}, column {column:?}: cannot parse {value:?} as a number")]
    Parse {
        line: usize,
        column: String,
        value: String,
    },

    #[error("label column {0:?} not found in header")]
    MissingColumn(String),

    #[error(transparent)]
    Ml(#[from] MlError),
}

pub type IoResult<T> = Result<T, IoError>;
