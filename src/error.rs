use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the pipeline and its storage gateway.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested object does not exist in the bucket. Recovered only
    /// where an absent ledger is a valid initial state; fatal elsewhere.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// The ledger blob exists but its columns or values do not match the
    /// expected schema. Never auto-repaired.
    #[error("ledger {key} does not match the expected schema")]
    MalformedLedger { key: String },

    /// A write was requested with a file format outside {csv, parquet}.
    #[error("unsupported target file format: {0}")]
    UnsupportedFormat(String),

    #[error("storage backend error: {0}")]
    Storage(#[source] object_store::Error),

    #[error("csv codec error: {0}")]
    Csv(#[from] csv::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet codec error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
