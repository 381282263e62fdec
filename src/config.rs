//! YAML run configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// Top-level layout of the configuration file passed on the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub s3: S3Config,
    pub source: SourceConfig,
    pub target: TargetConfig,
    pub meta: MetaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads and parses a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }
}

/// Endpoints and bucket names for both sides of the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub src_endpoint_url: String,
    pub src_bucket: String,
    pub trg_endpoint_url: String,
    pub trg_bucket: String,
}

/// Source bucket layout: the earliest date of interest and what the raw
/// columns are called.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Earliest trading date ever to be extracted.
    pub first_extract_date: NaiveDate,
    pub col_isin: String,
    pub col_date: String,
    pub col_time: String,
    pub col_start_price: String,
    pub col_min_price: String,
    pub col_max_price: String,
    pub col_traded_volume: String,
}

/// Target report layout and naming.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub col_isin: String,
    pub col_date: String,
    pub col_opening_price: String,
    pub col_closing_price: String,
    pub col_min_price: String,
    pub col_max_price: String,
    pub col_daily_traded_volume: String,
    pub col_change_prev_closing: String,
    /// Fixed key prefix for report blobs.
    pub key: String,
    /// `chrono` format string for the run timestamp appended to the key.
    pub key_date_format: String,
    /// Output format, `csv` or `parquet`.
    pub file_format: String,
}

impl TargetConfig {
    /// Header row of the report, in output column order.
    pub fn header(&self) -> Vec<&str> {
        vec![
            &self.col_isin,
            &self.col_date,
            &self.col_opening_price,
            &self.col_closing_price,
            &self.col_min_price,
            &self.col_max_price,
            &self.col_daily_traded_volume,
            &self.col_change_prev_closing,
        ]
    }
}

/// Key of the processing ledger in the target bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaConfig {
    pub key: String,
}

/// Default log level; `RUST_LOG` takes precedence at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
