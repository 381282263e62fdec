//! tickfold -- incremental batch ETL from object-stored intraday trading
//! records to per-instrument daily OHLC reports.
//!
//! A run resolves which source dates still need processing from a ledger
//! blob, pulls and folds the matching raw partitions, writes the report
//! under a timestamped key, then appends the covered dates to the ledger.

pub mod config;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod storage;
pub mod transform;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{DateWindow, Ledger, LedgerEntry};
pub use pipeline::Pipeline;
pub use report::{write_report, FileFormat};
pub use storage::{MemoryBucket, ObjectBucket, S3Bucket};
pub use types::{ReportRow, Tick, TickRow};
