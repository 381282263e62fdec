//! Core row types shared across the pipeline.

use chrono::{NaiveDate, NaiveTime};

/// Date format used for source partition prefixes, ledger entries and the
/// report date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One intraday source row as parsed from a partition blob.
///
/// Fields are parsed leniently: anything missing or unparseable is carried
/// as `None`. The transform drops such rows whole; there is no
/// partial-field imputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickRow {
    pub isin: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub start_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub traded_volume: Option<f64>,
}

impl TickRow {
    /// Returns the fully-populated view of this row, or `None` if any
    /// required field is missing.
    pub fn complete(&self) -> Option<Tick> {
        Some(Tick {
            isin: self.isin.clone()?,
            date: self.date?,
            time: self.time?,
            start_price: self.start_price?,
            min_price: self.min_price?,
            max_price: self.max_price?,
            traded_volume: self.traded_volume?,
        })
    }
}

/// A [`TickRow`] with every required field present.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub isin: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub start_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub traded_volume: f64,
}

/// One output row of the daily report, uniquely keyed by (isin, date).
/// All numeric fields are rounded to two decimal places.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub isin: String,
    pub date: NaiveDate,
    /// Start price of the day's chronologically-first record.
    pub opening_price: f64,
    /// Start price of the day's chronologically-last record.
    pub closing_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub daily_traded_volume: f64,
    /// Percent change of the opening price vs. the previous date in this
    /// instrument's series. `None` for the instrument's first reported date.
    pub change_prev_closing: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_requires_every_field() {
        let full = TickRow {
            isin: Some("DE0005140008".to_string()),
            date: NaiveDate::from_ymd_opt(2022, 12, 25),
            time: NaiveTime::from_hms_opt(8, 0, 0),
            start_price: Some(20.21),
            min_price: Some(20.10),
            max_price: Some(20.30),
            traded_volume: Some(500.0),
        };
        let tick = full.complete().unwrap();
        assert_eq!(tick.isin, "DE0005140008");
        assert_eq!(tick.start_price, 20.21);

        let missing_volume = TickRow {
            traded_volume: None,
            ..full
        };
        assert!(missing_volume.complete().is_none());
    }

    #[test]
    fn test_complete_on_empty_row() {
        assert!(TickRow::default().complete().is_none());
    }
}
