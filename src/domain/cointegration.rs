//! Pairwise cointegration diagnostics.
//!
//! Purely informational: the verdicts are reported but never gate copula
//! fitting.

use crate::domain::error::CopulaTraderError;
use crate::ports::cointegration_port::CointegrationTest;

pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct PairCointegration {
    pub first: String,
    pub second: String,
    pub statistic: f64,
    pub p_value: f64,
    pub cointegrated: bool,
}

impl PairCointegration {
    pub fn verdict_line(&self) -> String {
        format!(
            "{} and {} {} cointegrated with p-value: {:.4}",
            self.first,
            self.second,
            if self.cointegrated { "ARE" } else { "are NOT" },
            self.p_value
        )
    }
}

/// Tests every unordered pair `(i, j)`, `i < j`, in index order.
pub fn check_pairs(
    test: &dyn CointegrationTest,
    names: &[String],
    columns: &[Vec<f64>],
    significance: f64,
) -> Result<Vec<PairCointegration>, CopulaTraderError> {
    if names.len() != columns.len() {
        return Err(CopulaTraderError::invalid_input(format!(
            "{} names for {} series",
            names.len(),
            columns.len()
        )));
    }

    let mut results = Vec::with_capacity(columns.len() * columns.len().saturating_sub(1) / 2);
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            let outcome = test.test(&columns[i], &columns[j])?;
            let pair = PairCointegration {
                first: names[i].clone(),
                second: names[j].clone(),
                statistic: outcome.statistic,
                p_value: outcome.p_value,
                cointegrated: outcome.p_value < significance,
            };
            log::debug!(
                "cointegration {}/{}: stat={:.4} p={:.4}",
                pair.first,
                pair.second,
                pair.statistic,
                pair.p_value
            );
            results.push(pair);
        }
    }
    Ok(results)
}
