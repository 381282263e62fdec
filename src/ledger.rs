//! Processing ledger: which source dates have been covered, and when.
//!
//! The ledger is a CSV blob in the target bucket, append-only across runs.
//! It is rewritten whole on every update (read-modify-write, no locking);
//! exactly one writer per ledger key is assumed.

use std::collections::HashSet;

use bytes::Bytes;
use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::storage::ObjectBucket;
use crate::types::DATE_FORMAT;

/// Ledger column holding the covered source date.
pub const SOURCE_DATE_COL: &str = "source_date";
/// Ledger column holding the timestamp of the run that covered it.
pub const PROCESSED_COL: &str = "datetime_of_processing";
/// Timestamp format used in [`PROCESSED_COL`].
pub const PROCESSED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sort-order sentinel returned when every date is already covered:
/// greater than any real report date, so the retention filter keeps
/// nothing.
pub fn far_future() -> NaiveDate {
    NaiveDate::from_ymd_opt(2200, 1, 1).expect("valid sentinel date")
}

/// One completed-date row. `processed_at` stays text so rewriting an
/// existing ledger never reinterprets timestamps written by older runs.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub source_date: NaiveDate,
    pub processed_at: String,
}

/// The date span one run should extract, plus its retention floor.
#[derive(Debug, Clone, PartialEq)]
pub struct DateWindow {
    /// Earliest date allowed into the final report.
    pub effective_start: NaiveDate,
    /// Every date to pull from the source, lookback day included.
    pub extract_dates: Vec<NaiveDate>,
}

impl DateWindow {
    /// The dates to mark completed after a successful load: everything
    /// pulled except the lookback-only day.
    pub fn completion_dates(&self) -> Vec<NaiveDate> {
        self.extract_dates
            .iter()
            .copied()
            .filter(|date| *date >= self.effective_start)
            .collect()
    }
}

/// Resolver over the ledger blob at one key.
pub struct Ledger<'a> {
    bucket: &'a dyn ObjectBucket,
    key: String,
}

impl<'a> Ledger<'a> {
    pub fn new(bucket: &'a dyn ObjectBucket, key: impl Into<String>) -> Self {
        Self {
            bucket,
            key: key.into(),
        }
    }

    /// Decides which dates this run must pull.
    ///
    /// One day of lookback before `first_extract_date` is always included
    /// so the first kept report row can compute its delta. When the ledger
    /// has a gap, everything from one day before the earliest missing date
    /// forward is re-pulled for the same reason. A fully covered ledger
    /// yields an empty list and the [`far_future`] floor.
    pub fn resolve(&self, first_extract_date: NaiveDate, today: NaiveDate) -> Result<DateWindow> {
        let start = first_extract_date - Days::new(1);
        let all_dates = date_span(start, today);

        let recorded = match self.bucket.get(&self.key) {
            Ok(body) => self.recorded_dates(&body)?,
            Err(Error::NotFound { .. }) => {
                debug!(key = %self.key, "no ledger yet; extracting the full span");
                return Ok(DateWindow {
                    effective_start: first_extract_date,
                    extract_dates: all_dates,
                });
            }
            Err(err) => return Err(err),
        };

        // The lookback day itself is never required to have been recorded.
        let missing = all_dates
            .iter()
            .skip(1)
            .copied()
            .filter(|date| !recorded.contains(date))
            .min();

        match missing {
            Some(first_missing) => {
                let boundary = first_missing - Days::new(1);
                Ok(DateWindow {
                    effective_start: first_missing,
                    extract_dates: all_dates
                        .into_iter()
                        .filter(|date| *date >= boundary)
                        .collect(),
                })
            }
            None => Ok(DateWindow {
                effective_start: far_future(),
                extract_dates: Vec::new(),
            }),
        }
    }

    /// Appends `dates` stamped with `now`, rewriting the blob whole.
    /// Returns whether a write actually happened.
    pub fn record_completion(&self, dates: &[NaiveDate], now: NaiveDateTime) -> Result<bool> {
        if dates.is_empty() {
            info!(key = %self.key, "no freshly covered dates; ledger unchanged");
            return Ok(false);
        }

        let mut entries = match self.bucket.get(&self.key) {
            Ok(body) => self.parse_entries(&body)?,
            Err(Error::NotFound { .. }) => Vec::new(),
            Err(err) => return Err(err),
        };

        let stamp = now.format(PROCESSED_FORMAT).to_string();
        entries.extend(dates.iter().map(|date| LedgerEntry {
            source_date: *date,
            processed_at: stamp.clone(),
        }));

        self.bucket.put(&self.key, encode_entries(&entries)?)?;
        info!(key = %self.key, appended = dates.len(), "ledger updated");
        Ok(true)
    }

    fn malformed(&self) -> Error {
        Error::MalformedLedger {
            key: self.key.clone(),
        }
    }

    /// Distinct recorded source dates. Only the source-date column needs to
    /// be present here; an unparseable date is treated as corruption.
    fn recorded_dates(&self, body: &Bytes) -> Result<HashSet<NaiveDate>> {
        let mut reader = csv::Reader::from_reader(body.as_ref());
        let index = reader
            .headers()?
            .iter()
            .position(|header| header == SOURCE_DATE_COL)
            .ok_or_else(|| self.malformed())?;

        let mut dates = HashSet::new();
        for record in reader.records() {
            let record = record?;
            let raw = record.get(index).ok_or_else(|| self.malformed())?;
            let date =
                NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| self.malformed())?;
            dates.insert(date);
        }
        Ok(dates)
    }

    /// Strict parse used before rewriting: the header must carry exactly
    /// the two ledger columns.
    fn parse_entries(&self, body: &Bytes) -> Result<Vec<LedgerEntry>> {
        let mut reader = csv::Reader::from_reader(body.as_ref());
        let headers = reader.headers()?.clone();

        let mut names: Vec<&str> = headers.iter().collect();
        names.sort_unstable();
        if names != [PROCESSED_COL, SOURCE_DATE_COL] {
            return Err(self.malformed());
        }
        let date_index = headers
            .iter()
            .position(|header| header == SOURCE_DATE_COL)
            .ok_or_else(|| self.malformed())?;
        let processed_index = headers
            .iter()
            .position(|header| header == PROCESSED_COL)
            .ok_or_else(|| self.malformed())?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let raw = record.get(date_index).ok_or_else(|| self.malformed())?;
            entries.push(LedgerEntry {
                source_date: NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .map_err(|_| self.malformed())?,
                processed_at: record.get(processed_index).unwrap_or_default().to_string(),
            });
        }
        Ok(entries)
    }
}

/// Every calendar date in `[from, to]`, empty when `from > to`.
fn date_span(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = from;
    while current <= to {
        dates.push(current);
        current = current + Days::new(1);
    }
    dates
}

fn encode_entries(entries: &[LedgerEntry]) -> Result<Bytes> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([SOURCE_DATE_COL, PROCESSED_COL])?;
    for entry in entries {
        writer.write_record([
            entry.source_date.format(DATE_FORMAT).to_string(),
            entry.processed_at.clone(),
        ])?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|err| Error::Io(err.into_error()))?;
    Ok(Bytes::from(buffer))
}
