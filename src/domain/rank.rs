//! Empirical percentile-rank transform.
//!
//! Each column is mapped to `rank / n` with tied values sharing the average
//! rank of their group, so every entry lies in (0, 1].

use crate::domain::error::CopulaTraderError;
use crate::domain::returns::ReturnMatrix;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct RankMatrix {
    pub names: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<Vec<f64>>,
}

impl RankMatrix {
    /// Builds a rank matrix from already-transformed columns.
    ///
    /// Used by fitters and tests that produce pseudo-observations directly;
    /// the columns must be equally long and lie in [0, 1].
    pub fn from_columns(columns: Vec<Vec<f64>>) -> Result<Self, CopulaTraderError> {
        let n = columns.first().map(|c| c.len()).unwrap_or(0);
        if columns.iter().any(|c| c.len() != n) {
            return Err(CopulaTraderError::invalid_input(
                "rank columns have different lengths",
            ));
        }
        if columns
            .iter()
            .flatten()
            .any(|u| !(0.0..=1.0).contains(u))
        {
            return Err(CopulaTraderError::invalid_input(
                "rank values must lie in [0, 1]",
            ));
        }
        let names = (1..=columns.len()).map(|j| format!("V{j}")).collect();
        Ok(Self {
            names,
            dates: Vec::new(),
            columns,
        })
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, t: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[t]).collect()
    }

    /// Row-major copy, one `Vec` per observation.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows()).map(|t| self.row(t)).collect()
    }
}

pub fn rank_matrix(returns: &ReturnMatrix) -> Result<RankMatrix, CopulaTraderError> {
    let mut columns = Vec::with_capacity(returns.cols());
    for (name, column) in returns.names.iter().zip(&returns.columns) {
        let ranks = percentile_ranks(column).map_err(|e| match e {
            CopulaTraderError::InvalidInput { reason } => {
                CopulaTraderError::invalid_input(format!("{name}: {reason}"))
            }
            other => other,
        })?;
        columns.push(ranks);
    }

    Ok(RankMatrix {
        names: returns.names.clone(),
        dates: returns.dates.clone(),
        columns,
    })
}

pub fn percentile_ranks(values: &[f64]) -> Result<Vec<f64>, CopulaTraderError> {
    let n = values.len();
    if n < 2 {
        return Err(CopulaTraderError::invalid_input(format!(
            "need at least 2 observations to rank, got {n}"
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CopulaTraderError::invalid_input(
            "cannot rank non-finite values",
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    if values[order[0]] == values[order[n - 1]] {
        return Err(CopulaTraderError::invalid_input(
            "constant column has no meaningful rank",
        ));
    }

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their mean
        let avg = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg / n as f64;
        }
        i = j + 1;
    }

    Ok(ranks)
}
