//! CSV file market data adapter.
//!
//! One file per series at `<dir>/<SERIES>.csv` with a header row. The date
//! column is `date`; the price column is `close`, falling back to
//! `adj close`. Header matching ignores case. Other columns are ignored.

use crate::domain::error::CopulaTraderError;
use crate::domain::series::{PricePoint, PriceSeries};
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const CLOSE_HEADERS: [&str; 3] = ["close", "adj close", "adj_close"];

pub struct CsvMarketData {
    base_path: PathBuf,
}

impl CsvMarketData {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, series: &str) -> PathBuf {
        self.base_path.join(format!("{series}.csv"))
    }
}

fn unavailable(series: &str, reason: impl Into<String>) -> CopulaTraderError {
    CopulaTraderError::DataUnavailable {
        series: series.to_string(),
        reason: reason.into(),
    }
}

fn is_missing(cell: &str) -> bool {
    matches!(
        cell.trim().to_lowercase().as_str(),
        "" | "null" | "nan" | "na"
    )
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    let day = cell.get(..10).unwrap_or(cell);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl MarketDataPort for CsvMarketData {
    fn fetch_closes(
        &self,
        series: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, CopulaTraderError> {
        let path = self.csv_path(series);
        let content = fs::read_to_string(&path)
            .map_err(|e| unavailable(series, format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| unavailable(series, format!("CSV header error: {e}")))?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let date_col = headers
            .iter()
            .position(|h| h == "date")
            .ok_or_else(|| unavailable(series, "missing date column"))?;
        let close_col = CLOSE_HEADERS
            .iter()
            .find_map(|name| headers.iter().position(|h| h == name))
            .ok_or_else(|| unavailable(series, "missing close column"))?;

        let mut points = Vec::new();
        let mut skipped = 0usize;
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| unavailable(series, format!("CSV parse error: {e}")))?;

            let date_cell = record.get(date_col).unwrap_or("");
            let date = parse_date(date_cell).ok_or_else(|| {
                unavailable(
                    series,
                    format!("invalid date '{}' on row {}", date_cell, line + 1),
                )
            })?;
            if date < start_date || date > end_date {
                continue;
            }

            let close_cell = record.get(close_col).unwrap_or("");
            if is_missing(close_cell) {
                skipped += 1;
                continue;
            }
            let close: f64 = close_cell.trim().parse().map_err(|_| {
                unavailable(
                    series,
                    format!("invalid close value '{}' on row {}", close_cell, line + 1),
                )
            })?;
            points.push(PricePoint { date, close });
        }

        if skipped > 0 {
            log::warn!("{series}: skipped {skipped} rows without a close");
        }
        if points.is_empty() {
            return Err(unavailable(
                series,
                format!("no closes between {start_date} and {end_date}"),
            ));
        }
        Ok(PriceSeries::new(series, points))
    }

    fn list_series(&self) -> Result<Vec<String>, CopulaTraderError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("EURUSD=X.csv"),
            "date,close\n\
             2024-01-17,1.0880\n\
             2024-01-15,1.0950\n\
             2024-01-16,\n\
             2024-01-18,null\n\
             2024-01-19,1.0890\n",
        )
        .unwrap();
        fs::write(
            path.join("GBPUSD=X.csv"),
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-15 00:00:00+00:00,1.27,1.28,1.26,1.2740,1.2741,0\n\
             2024-01-16 00:00:00+00:00,1.27,1.28,1.26,1.2690,1.2691,0\n",
        )
        .unwrap();
        fs::write(path.join("AUDUSD=X.csv"), "Date,Adj Close\n2024-01-15,0.66\n").unwrap();
        fs::write(path.join("notes.txt"), "not data").unwrap();

        (dir, path)
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_sorts_and_skips_missing_cells() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);

        let series = adapter.fetch_closes("EURUSD=X", jan(1), jan(31)).unwrap();
        assert_eq!(series.name, "EURUSD=X");
        let dates: Vec<NaiveDate> = series.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![jan(15), jan(17), jan(19)]);
        assert_eq!(series.close_on(jan(15)), Some(1.0950));
    }

    #[test]
    fn fetch_filters_by_date_inclusive() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);

        let series = adapter.fetch_closes("EURUSD=X", jan(17), jan(17)).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.first_date(), Some(jan(17)));
    }

    #[test]
    fn prefers_close_over_adj_close_and_accepts_timestamps() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);

        let series = adapter.fetch_closes("GBPUSD=X", jan(1), jan(31)).unwrap();
        assert_eq!(series.close_on(jan(16)), Some(1.2690));
    }

    #[test]
    fn falls_back_to_adj_close() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);

        let series = adapter.fetch_closes("AUDUSD=X", jan(1), jan(31)).unwrap();
        assert_eq!(series.close_on(jan(15)), Some(0.66));
    }

    #[test]
    fn unknown_series_is_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);

        let err = adapter.fetch_closes("USDJPY=X", jan(1), jan(31)).unwrap_err();
        assert!(matches!(err, CopulaTraderError::DataUnavailable { ref series, .. } if series == "USDJPY=X"));
    }

    #[test]
    fn empty_range_is_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);

        let err = adapter
            .fetch_closes("EURUSD=X", NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), jan(1))
            .unwrap_err();
        assert!(matches!(err, CopulaTraderError::DataUnavailable { .. }));
    }

    #[test]
    fn bad_close_value_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("X.csv"), "date,close\n2024-01-15,abc\n").unwrap();
        let adapter = CsvMarketData::new(dir.path().to_path_buf());
        assert!(adapter.fetch_closes("X", jan(1), jan(31)).is_err());
    }

    #[test]
    fn list_series_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);

        assert_eq!(
            adapter.list_series().unwrap(),
            vec!["AUDUSD=X", "EURUSD=X", "GBPUSD=X"]
        );
    }
}
