//! Per-series simple returns over an aligned date index.

use crate::domain::error::CopulaTraderError;
use crate::domain::series::SeriesSet;
use chrono::NaiveDate;

/// `columns[j][t]` is the return of series `j` from `dates[t-1]` to `dates[t]`
/// of the source set; the first source date has no return and is dropped.
#[derive(Debug, Clone)]
pub struct ReturnMatrix {
    pub names: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    pub fn from_series(set: &SeriesSet) -> Result<Self, CopulaTraderError> {
        let mut columns = Vec::with_capacity(set.series_count());
        for (name, closes) in set.names.iter().zip(&set.closes) {
            let column = pct_change(closes);
            if let Some(t) = column.iter().position(|r| !r.is_finite()) {
                return Err(CopulaTraderError::invalid_input(format!(
                    "non-finite return for {} on {}",
                    name,
                    set.dates[t + 1]
                )));
            }
            columns.push(column);
        }

        Ok(Self {
            names: set.names.clone(),
            dates: set.dates[1..].to_vec(),
            columns,
        })
    }

    pub fn rows(&self) -> usize {
        self.dates.len()
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|j| self.columns[j].as_slice())
    }
}

/// p[t] / p[t-1] - 1
pub fn pct_change(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}
