use thiserror::Error;

/// Error type for the fallible edges of the ledger: parsing, persistence and configuration.
///
/// Ledger operations themselves never fail; an operation naming an account or
/// transaction that does not exist is absorbed as a no-op.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid amount: `{0}`")]
    InvalidAmount(String),
    #[error("Invalid date: `{0}`")]
    InvalidDate(String),
    #[error("Malformed data on line {line}: {message}")]
    MalformedData { line: usize, message: String },
    #[error("Text must fit on one line of the ledger file: {0:?}")]
    UnstorableText(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
