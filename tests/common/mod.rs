#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use copulatrader::domain::error::CopulaTraderError;
use copulatrader::domain::series::{PricePoint, PriceSeries};
use copulatrader::ports::data_port::MarketDataPort;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

pub struct MockMarketData {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, name: &str, closes: &[f64]) -> Self {
        self.data
            .insert(name.to_string(), make_series(name, start_date(), closes));
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_closes(
        &self,
        series: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, CopulaTraderError> {
        if let Some(reason) = self.errors.get(series) {
            return Err(CopulaTraderError::DataUnavailable {
                series: series.to_string(),
                reason: reason.clone(),
            });
        }
        let source = self
            .data
            .get(series)
            .ok_or_else(|| CopulaTraderError::DataUnavailable {
                series: series.to_string(),
                reason: "not in mock".into(),
            })?;
        let points: Vec<PricePoint> = source
            .points
            .iter()
            .filter(|p| p.date >= start_date && p.date <= end_date)
            .copied()
            .collect();
        Ok(PriceSeries::new(series, points))
    }

    fn list_series(&self) -> Result<Vec<String>, CopulaTraderError> {
        let mut names: Vec<String> = self.data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Weekdays starting at `start`.
pub fn business_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut d = start;
    while dates.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(d);
        }
        d += Duration::days(1);
    }
    dates
}

pub fn make_series(name: &str, start: NaiveDate, closes: &[f64]) -> PriceSeries {
    let points = business_days(start, closes.len())
        .into_iter()
        .zip(closes)
        .map(|(date, &close)| PricePoint { date, close })
        .collect();
    PriceSeries::new(name, points)
}

pub fn noise(n: usize, seed: u64) -> Vec<f64> {
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| normal.sample(&mut rng)).collect()
}

/// Gaussian random walk with unit steps.
pub fn random_walk(n: usize, seed: u64, start: f64) -> Vec<f64> {
    noise(n, seed)
        .into_iter()
        .scan(start, |level, step| {
            *level += step;
            Some(*level)
        })
        .collect()
}

/// Four price series of length `n`:
/// - `TREND`: a random walk plus an exponential drift, not cointegrated
///   with anything else
/// - `X`: a random walk
/// - `Y`: `2 * X` plus stationary noise, cointegrated with `X`
/// - `W`: an independent random walk
///
/// Pairs are tested in this order, so `TREND` is always the regressand.
pub fn synthetic_universe(n: usize, seed: u64) -> Vec<(String, Vec<f64>)> {
    let x = random_walk(n, seed, 500.0);
    let y: Vec<f64> = x
        .iter()
        .zip(noise(n, seed + 1))
        .map(|(xi, e)| 2.0 * xi + 0.5 * e)
        .collect();
    let growth = 10.0 / n as f64;
    let trend: Vec<f64> = random_walk(n, seed + 2, 500.0)
        .into_iter()
        .enumerate()
        .map(|(t, v)| v + (growth * t as f64).exp())
        .collect();
    let w = random_walk(n, seed + 3, 500.0);
    vec![
        ("TREND".to_string(), trend),
        ("X".to_string(), x),
        ("Y".to_string(), y),
        ("W".to_string(), w),
    ]
}

pub fn mock_universe(n: usize, seed: u64) -> MockMarketData {
    synthetic_universe(n, seed)
        .into_iter()
        .fold(MockMarketData::new(), |port, (name, closes)| {
            port.with_closes(&name, &closes)
        })
}

/// Writes `<dir>/<name>.csv` with a `date,close` header.
pub fn write_csv(dir: &Path, name: &str, closes: &[f64]) {
    let mut content = String::from("date,close\n");
    for (date, close) in business_days(start_date(), closes.len())
        .into_iter()
        .zip(closes)
    {
        content.push_str(&format!("{date},{close}\n"));
    }
    fs::write(dir.join(format!("{name}.csv")), content).unwrap();
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
