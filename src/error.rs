use std::path::PathBuf;
use thiserror::Error;

/// Failures a caller can act on. Everything else travels as `anyhow::Error`
/// with context attached at the I/O boundary.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV not found: {}", .0.display())]
    CsvNotFound(PathBuf),

    #[error("CSV has no header row: {}", .0.display())]
    EmptyCsv(PathBuf),

    #[error("{} is not valid {encoding}", .path.display())]
    Decode { path: PathBuf, encoding: String },

    #[error("record on line {line} has {found} fields, header has {expected}")]
    RaggedRecord {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
