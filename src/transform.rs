//! Daily aggregation: folds intraday ticks into per-instrument report rows.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::types::{ReportRow, Tick, TickRow};

/// Running aggregate for one (isin, date) group.
struct DayFold {
    first_time: NaiveTime,
    opening_price: f64,
    last_time: NaiveTime,
    closing_price: f64,
    min_price: f64,
    max_price: f64,
    traded_volume: f64,
}

impl DayFold {
    fn new(tick: &Tick) -> Self {
        Self {
            first_time: tick.time,
            opening_price: tick.start_price,
            last_time: tick.time,
            closing_price: tick.start_price,
            min_price: tick.min_price,
            max_price: tick.max_price,
            traded_volume: tick.traded_volume,
        }
    }

    fn absorb(&mut self, tick: &Tick) {
        // Records sharing the earliest (or latest) time resolve to the
        // minimum start price.
        match tick.time.cmp(&self.first_time) {
            Ordering::Less => {
                self.first_time = tick.time;
                self.opening_price = tick.start_price;
            }
            Ordering::Equal => self.opening_price = self.opening_price.min(tick.start_price),
            Ordering::Greater => {}
        }
        match tick.time.cmp(&self.last_time) {
            Ordering::Greater => {
                self.last_time = tick.time;
                self.closing_price = tick.start_price;
            }
            Ordering::Equal => self.closing_price = self.closing_price.min(tick.start_price),
            Ordering::Less => {}
        }
        self.min_price = self.min_price.min(tick.min_price);
        self.max_price = self.max_price.max(tick.max_price);
        self.traded_volume += tick.traded_volume;
    }
}

/// Rounds to two decimal places, the precision of every report field.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Builds the daily report from raw intraday rows.
///
/// Rows with any missing field are dropped whole. The percent-change chain
/// is computed over the full aggregated series before the retention floor
/// trims it, so the first kept date still gets its delta from a lookback
/// day that never appears in the output.
pub fn daily_report(rows: &[TickRow], retention_floor: NaiveDate) -> Vec<ReportRow> {
    let mut groups: BTreeMap<(String, NaiveDate), DayFold> = BTreeMap::new();
    let mut dropped = 0usize;
    for row in rows {
        match row.complete() {
            Some(tick) => {
                groups
                    .entry((tick.isin.clone(), tick.date))
                    .and_modify(|fold| fold.absorb(&tick))
                    .or_insert_with(|| DayFold::new(&tick));
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "rows with missing fields dropped");
    }

    // BTreeMap order keeps each instrument's dates consecutive and sorted,
    // so the previous opening price is always the entry just visited.
    let mut report = Vec::new();
    let mut previous: Option<(String, f64)> = None;
    for ((isin, date), fold) in &groups {
        let change = match &previous {
            Some((prev_isin, prev_open)) if prev_isin == isin => {
                Some(round2((fold.opening_price - prev_open) / prev_open * 100.0))
            }
            _ => None,
        };
        previous = Some((isin.clone(), fold.opening_price));

        if *date < retention_floor {
            continue;
        }
        report.push(ReportRow {
            isin: isin.clone(),
            date: *date,
            opening_price: round2(fold.opening_price),
            closing_price: round2(fold.closing_price),
            min_price: round2(fold.min_price),
            max_price: round2(fold.max_price),
            daily_traded_volume: round2(fold.traded_volume),
            change_prev_closing: change,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 12, d).unwrap()
    }

    fn tick(isin: &str, day: u32, time: (u32, u32), start: f64, min: f64, max: f64, vol: f64) -> TickRow {
        TickRow {
            isin: Some(isin.to_string()),
            date: Some(date(day)),
            time: NaiveTime::from_hms_opt(time.0, time.1, 0),
            start_price: Some(start),
            min_price: Some(min),
            max_price: Some(max),
            traded_volume: Some(vol),
        }
    }

    #[test]
    fn test_empty_input_yields_empty_report() {
        assert!(daily_report(&[], date(1)).is_empty());
    }

    #[test]
    fn test_single_day_aggregates() {
        let rows = vec![
            tick("X", 26, (12, 0), 20.25, 20.20, 20.40, 505.0),
            tick("X", 26, (8, 0), 20.21, 20.10, 20.30, 500.0),
        ];
        let report = daily_report(&rows, date(1));
        assert_eq!(report.len(), 1);

        let row = &report[0];
        assert_eq!(row.isin, "X");
        assert_eq!(row.date, date(26));
        assert_eq!(row.opening_price, 20.21);
        assert_eq!(row.closing_price, 20.25);
        assert_eq!(row.min_price, 20.10);
        assert_eq!(row.max_price, 20.40);
        assert_eq!(row.daily_traded_volume, 1005.0);
        assert_eq!(row.change_prev_closing, None);
    }

    #[test]
    fn test_percent_change_chain() {
        // Opening prices 20.21, 20.58, 23.58 -> changes None, 1.83, 14.58.
        let rows = vec![
            tick("X", 26, (8, 0), 20.21, 20.0, 21.0, 100.0),
            tick("X", 27, (8, 0), 20.58, 20.0, 21.0, 100.0),
            tick("X", 28, (8, 0), 23.58, 23.0, 24.0, 100.0),
        ];
        let report = daily_report(&rows, date(1));
        assert_eq!(report.len(), 3);
        assert_eq!(report[0].change_prev_closing, None);
        assert_eq!(report[1].change_prev_closing, Some(1.83));
        assert_eq!(report[2].change_prev_closing, Some(14.58));
    }

    #[test]
    fn test_percent_change_skips_calendar_gaps() {
        // The 27th is absent; the 28th's delta chains back to the 26th.
        let rows = vec![
            tick("X", 26, (8, 0), 20.00, 20.0, 21.0, 100.0),
            tick("X", 28, (8, 0), 21.00, 20.0, 22.0, 100.0),
        ];
        let report = daily_report(&rows, date(1));
        assert_eq!(report[1].change_prev_closing, Some(5.0));
    }

    #[test]
    fn test_each_instrument_starts_its_own_chain() {
        let rows = vec![
            tick("A", 26, (8, 0), 10.0, 9.0, 11.0, 100.0),
            tick("A", 27, (8, 0), 11.0, 10.0, 12.0, 100.0),
            tick("B", 27, (8, 0), 50.0, 49.0, 51.0, 100.0),
        ];
        let report = daily_report(&rows, date(1));
        assert_eq!(report.len(), 3);
        assert_eq!(report[0].change_prev_closing, None);
        assert_eq!(report[1].change_prev_closing, Some(10.0));
        // B's first date must not chain off A's series.
        assert_eq!(report[2].change_prev_closing, None);
    }

    #[test]
    fn test_rows_with_missing_fields_are_dropped() {
        let mut incomplete = tick("X", 26, (9, 0), 99.0, 99.0, 99.0, 100.0);
        incomplete.min_price = None;
        let rows = vec![tick("X", 26, (8, 0), 20.0, 19.0, 21.0, 100.0), incomplete];

        let report = daily_report(&rows, date(1));
        assert_eq!(report.len(), 1);
        // The dropped row contributes nothing, not even its volume.
        assert_eq!(report[0].daily_traded_volume, 100.0);
        assert_eq!(report[0].closing_price, 20.0);
    }

    #[test]
    fn test_tied_times_resolve_to_minimum_start_price() {
        let rows = vec![
            tick("X", 26, (8, 0), 20.30, 20.0, 21.0, 100.0),
            tick("X", 26, (8, 0), 20.10, 20.0, 21.0, 100.0),
            tick("X", 26, (17, 0), 20.90, 20.0, 21.0, 100.0),
            tick("X", 26, (17, 0), 20.70, 20.0, 21.0, 100.0),
        ];
        let report = daily_report(&rows, date(1));
        assert_eq!(report[0].opening_price, 20.10);
        assert_eq!(report[0].closing_price, 20.70);
    }

    #[test]
    fn test_retention_floor_trims_but_still_feeds_the_delta() {
        let rows = vec![
            tick("X", 25, (8, 0), 20.21, 20.0, 21.0, 100.0),
            tick("X", 26, (8, 0), 20.58, 20.0, 21.0, 100.0),
        ];
        let report = daily_report(&rows, date(26));
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].date, date(26));
        assert_eq!(report[0].change_prev_closing, Some(1.83));
    }

    #[test]
    fn test_output_keys_match_complete_input_groups() {
        let rows = vec![
            tick("A", 26, (8, 0), 10.0, 9.0, 11.0, 100.0),
            tick("A", 26, (9, 0), 10.5, 9.5, 11.5, 100.0),
            tick("B", 27, (8, 0), 50.0, 49.0, 51.0, 100.0),
        ];
        let report = daily_report(&rows, date(1));
        let keys: Vec<(&str, NaiveDate)> =
            report.iter().map(|row| (row.isin.as_str(), row.date)).collect();
        assert_eq!(keys, vec![("A", date(26)), ("B", date(27))]);
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        let rows = vec![
            tick("X", 26, (8, 0), 20.216, 20.104, 21.006, 100.4),
        ];
        let report = daily_report(&rows, date(1));
        assert_eq!(report[0].opening_price, 20.22);
        assert_eq!(report[0].min_price, 20.10);
        assert_eq!(report[0].max_price, 21.01);
        assert_eq!(report[0].daily_traded_volume, 100.4);
    }
}
