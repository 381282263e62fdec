//! Parsing of raw source partition blobs.
//!
//! Source files are CSV, one blob per (date, hour) partition. The columns
//! to pull are configured by name, so a reordered or widened source header
//! keeps working.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveTime};
use csv::StringRecord;
use tracing::warn;

use crate::config::SourceConfig;
use crate::error::Result;
use crate::types::{TickRow, DATE_FORMAT};

/// Positions of the configured columns within one blob's header.
struct ColumnIndex {
    isin: Option<usize>,
    date: Option<usize>,
    time: Option<usize>,
    start_price: Option<usize>,
    min_price: Option<usize>,
    max_price: Option<usize>,
    traded_volume: Option<usize>,
}

impl ColumnIndex {
    fn locate(headers: &StringRecord, config: &SourceConfig) -> Self {
        let find = |name: &str| {
            let index = headers.iter().position(|header| header == name);
            if index.is_none() {
                warn!(column = name, "source column missing; affected rows will be dropped");
            }
            index
        };
        Self {
            isin: find(&config.col_isin),
            date: find(&config.col_date),
            time: find(&config.col_time),
            start_price: find(&config.col_start_price),
            min_price: find(&config.col_min_price),
            max_price: find(&config.col_max_price),
            traded_volume: find(&config.col_traded_volume),
        }
    }

    fn parse_row(&self, record: &StringRecord) -> TickRow {
        TickRow {
            isin: field(record, self.isin).map(str::to_string),
            date: field(record, self.date).and_then(parse_date),
            time: field(record, self.time).and_then(parse_time),
            start_price: field(record, self.start_price).and_then(parse_number),
            min_price: field(record, self.min_price).and_then(parse_number),
            max_price: field(record, self.max_price).and_then(parse_number),
            traded_volume: field(record, self.traded_volume).and_then(parse_number),
        }
    }
}

fn field<'a>(record: &'a StringRecord, index: Option<usize>) -> Option<&'a str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse().ok()
}

/// Parses one partition blob into lenient tick rows.
///
/// Field-level problems leave the field as `None`; the transform drops
/// such rows. A structurally broken CSV record is an error.
pub fn parse_ticks(body: &Bytes, config: &SourceConfig) -> Result<Vec<TickRow>> {
    let mut reader = csv::Reader::from_reader(body.as_ref());
    let index = ColumnIndex::locate(reader.headers()?, config);
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(index.parse_row(&record?));
    }
    Ok(rows)
}
