// error.rs: error types for staging, parsing and settings loading
use thiserror::Error;

/// Hard failures raised by the record staging buffer.
///
/// Both variants are driver bugs or malformed input that the staging buffer
/// cannot recover from on its own; the caller decides whether to abort the
/// row or the whole parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A record tried to stage more fields than `max_columns` allows.
    #[error("record has more than {max_columns} columns (rejected column index {column})")]
    CapacityExceeded { max_columns: usize, column: usize },

    /// A call arrived out of the append -> finalize -> reset order.
    #[error("{operation} called out of sequence: expected {expected}")]
    OutOfSequence {
        operation: &'static str,
        expected: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    /// A staging failure, tagged with the 1-based input line it happened on.
    #[error("line {line}: {source}")]
    Row { line: usize, source: StageError },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported settings version: {0}")]
    UnsupportedVersion(u32),

    #[error("invalid settings: {0}")]
    Invalid(String),
}
