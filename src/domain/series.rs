//! Closing-price series and date alignment across series.

use crate::domain::error::CopulaTraderError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// A named series of closing prices, sorted ascending by date.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub name: String,
    pub points: Vec<PricePoint>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    pub fn new(name: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        let date_index = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self {
            name: name.into(),
            points,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.date_index.get(&date).map(|&i| self.points[i].close)
    }

    /// Close on `date`, or the latest close before it.
    pub fn close_on_or_before(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.points.partition_point(|p| p.date <= date);
        idx.checked_sub(1).map(|i| self.points[i].close)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// Series aligned to one shared, strictly increasing date index.
///
/// `closes[j][t]` is the close of series `j` on `dates[t]`.
#[derive(Debug, Clone)]
pub struct SeriesSet {
    pub names: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<Vec<f64>>,
}

impl SeriesSet {
    /// Outer-joins the series from the first date on which all of them have
    /// started. A series with no close on a later date carries its previous
    /// close forward, so a gap becomes a zero return rather than a dropped row.
    pub fn align(series: &[PriceSeries]) -> Result<Self, CopulaTraderError> {
        if series.len() < 2 {
            return Err(CopulaTraderError::invalid_input(format!(
                "need at least 2 series, got {}",
                series.len()
            )));
        }

        let mut start = None;
        for s in series {
            let first = s.first_date().ok_or_else(|| {
                CopulaTraderError::invalid_input(format!("series '{}' has no prices", s.name))
            })?;
            start = start.max(Some(first));
        }

        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .filter(|d| Some(*d) >= start)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if dates.len() < 2 {
            return Err(CopulaTraderError::invalid_input(format!(
                "only {} aligned dates across {} series",
                dates.len(),
                series.len()
            )));
        }

        let closes = series
            .iter()
            .map(|s| {
                dates
                    .iter()
                    .map(|d| s.close_on_or_before(*d))
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| {
                        CopulaTraderError::invalid_input(format!(
                            "series '{}' has no close before {}",
                            s.name, dates[0]
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            names: series.iter().map(|s| s.name.clone()).collect(),
            dates,
            closes,
        })
    }

    pub fn series_count(&self) -> usize {
        self.names.len()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
