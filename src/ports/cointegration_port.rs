//! Cointegration test port trait.

use crate::domain::error::CopulaTraderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CointegrationTestResult {
    pub statistic: f64,
    /// p-value for the null hypothesis of no cointegration.
    pub p_value: f64,
}

/// A pure two-series cointegration test.
pub trait CointegrationTest {
    fn test(&self, y: &[f64], x: &[f64]) -> Result<CointegrationTestResult, CopulaTraderError>;
}
