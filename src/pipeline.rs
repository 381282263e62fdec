//! End-to-end orchestration of one ETL run.

use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::config::{SourceConfig, TargetConfig};
use crate::error::Result;
use crate::ledger::{DateWindow, Ledger};
use crate::report::{self, FileFormat};
use crate::source;
use crate::storage::ObjectBucket;
use crate::transform;
use crate::types::{ReportRow, TickRow, DATE_FORMAT};

/// One configured run over a source and a target bucket.
///
/// The date window is resolved against the ledger up front; extract,
/// transform and load all work off that snapshot.
pub struct Pipeline<'a> {
    source_bucket: &'a dyn ObjectBucket,
    target_bucket: &'a dyn ObjectBucket,
    meta_key: String,
    src: SourceConfig,
    trg: TargetConfig,
    window: DateWindow,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source_bucket: &'a dyn ObjectBucket,
        target_bucket: &'a dyn ObjectBucket,
        meta_key: impl Into<String>,
        src: SourceConfig,
        trg: TargetConfig,
    ) -> Result<Self> {
        let meta_key = meta_key.into();
        let today = Local::now().date_naive();
        let window =
            Ledger::new(target_bucket, meta_key.clone()).resolve(src.first_extract_date, today)?;
        info!(
            effective_start = %window.effective_start,
            dates = window.extract_dates.len(),
            "date window resolved"
        );
        Ok(Self {
            source_bucket,
            target_bucket,
            meta_key,
            src,
            trg,
            window,
        })
    }

    /// The window this run resolved to.
    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Reads and concatenates every source blob in the window. No matching
    /// blobs is an empty row set, not an error.
    pub fn extract(&self) -> Result<Vec<TickRow>> {
        info!("extracting source files");
        let mut rows = Vec::new();
        for date in &self.window.extract_dates {
            let prefix = date.format(DATE_FORMAT).to_string();
            for key in self.source_bucket.list(&prefix)? {
                let body = self.source_bucket.get(&key)?;
                rows.extend(source::parse_ticks(&body, &self.src)?);
            }
        }
        info!(rows = rows.len(), "extraction finished");
        Ok(rows)
    }

    /// Aggregates the extracted rows into the daily report.
    pub fn transform(&self, rows: &[TickRow]) -> Vec<ReportRow> {
        if rows.is_empty() {
            info!("no rows extracted; nothing to transform");
            return Vec::new();
        }
        info!("applying daily aggregation");
        let report = transform::daily_report(rows, self.window.effective_start);
        info!(rows = report.len(), "aggregation finished");
        report
    }

    /// Writes the report, then records the covered dates in the ledger.
    ///
    /// An empty report skips the write but still updates the ledger for
    /// the dates that were in fact processed.
    pub fn load(&self, report: &[ReportRow]) -> Result<()> {
        let now = Local::now().naive_local();
        let format: FileFormat = self.trg.file_format.parse()?;
        let key = self.target_key(now, format);
        report::write_report(self.target_bucket, &key, report, &self.trg, format)?;
        Ledger::new(self.target_bucket, self.meta_key.clone())
            .record_completion(&self.window.completion_dates(), now)?;
        Ok(())
    }

    /// Extract, transform, load in strict sequence. Any failure before
    /// `load` leaves both the target and the ledger untouched.
    pub fn run(&self) -> Result<()> {
        let rows = self.extract()?;
        let report = self.transform(&rows);
        self.load(&report)
    }

    fn target_key(&self, now: NaiveDateTime, format: FileFormat) -> String {
        format!(
            "{}{}.{}",
            self.trg.key,
            now.format(&self.trg.key_date_format),
            format.extension()
        )
    }
}
