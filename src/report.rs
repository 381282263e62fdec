//! Report encoding and the write-to-target contract.
//!
//! Each supported format has its own encoder; dispatch is an enum match,
//! and a format string outside the set fails when parsed at the write
//! call site.

use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use tracing::info;

use crate::config::TargetConfig;
use crate::error::{Error, Result};
use crate::storage::ObjectBucket;
use crate::types::{ReportRow, DATE_FORMAT};

/// Supported target file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
}

impl FileFormat {
    /// Key extension, identical to the config spelling.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Parquet => "parquet",
        }
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "csv" => Ok(FileFormat::Csv),
            "parquet" => Ok(FileFormat::Parquet),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Writes the report at `key`, encoded per `format`.
///
/// An empty report is an explicit no-op: nothing is written and `false`
/// is returned.
pub fn write_report(
    bucket: &dyn ObjectBucket,
    key: &str,
    rows: &[ReportRow],
    columns: &TargetConfig,
    format: FileFormat,
) -> Result<bool> {
    if rows.is_empty() {
        info!(key, "report is empty; nothing will be written");
        return Ok(false);
    }
    let body = match format {
        FileFormat::Csv => encode_csv(rows, columns)?,
        FileFormat::Parquet => encode_parquet(rows, columns)?,
    };
    bucket.put(key, body)?;
    info!(key, rows = rows.len(), "report written");
    Ok(true)
}

fn encode_csv(rows: &[ReportRow], columns: &TargetConfig) -> Result<Bytes> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.header())?;
    for row in rows {
        writer.write_record([
            row.isin.clone(),
            row.date.format(DATE_FORMAT).to_string(),
            row.opening_price.to_string(),
            row.closing_price.to_string(),
            row.min_price.to_string(),
            row.max_price.to_string(),
            row.daily_traded_volume.to_string(),
            row.change_prev_closing
                .map(|change| change.to_string())
                .unwrap_or_default(),
        ])?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|err| Error::Io(err.into_error()))?;
    Ok(Bytes::from(buffer))
}

fn encode_parquet(rows: &[ReportRow], columns: &TargetConfig) -> Result<Bytes> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(columns.col_isin.as_str(), DataType::Utf8, false),
        Field::new(columns.col_date.as_str(), DataType::Utf8, false),
        Field::new(columns.col_opening_price.as_str(), DataType::Float64, false),
        Field::new(columns.col_closing_price.as_str(), DataType::Float64, false),
        Field::new(columns.col_min_price.as_str(), DataType::Float64, false),
        Field::new(columns.col_max_price.as_str(), DataType::Float64, false),
        Field::new(
            columns.col_daily_traded_volume.as_str(),
            DataType::Float64,
            false,
        ),
        Field::new(
            columns.col_change_prev_closing.as_str(),
            DataType::Float64,
            true,
        ),
    ]));

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|row| row.isin.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|row| row.date.format(DATE_FORMAT).to_string()),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|row| row.opening_price),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|row| row.closing_price),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|row| row.min_price),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|row| row.max_price),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|row| row.daily_traded_volume),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|row| row.change_prev_closing),
        )),
    ];
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(Bytes::from(cursor.into_inner()))
}
