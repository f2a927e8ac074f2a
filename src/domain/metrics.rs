//! Strategy and benchmark performance metrics.

use crate::domain::error::CopulaTraderError;
use crate::domain::signal::{SignalCounts, TradingSignal};
use statrs::statistics::Statistics;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

// Constant series only reach a zero deviation up to rounding.
const ZERO_STD_TOLERANCE: f64 = 1e-14;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub periods: usize,
    pub counts: SignalCounts,
    pub cumulative: Vec<f64>,
}

impl PerformanceReport {
    /// Positions taken from the previous period's signal applied to `returns`.
    pub fn strategy(
        signals: &[TradingSignal],
        returns: &[f64],
    ) -> Result<Self, CopulaTraderError> {
        if signals.len() != returns.len() {
            return Err(CopulaTraderError::invalid_input(format!(
                "{} signals for {} returns",
                signals.len(),
                returns.len()
            )));
        }
        let daily = strategy_returns(signals, returns);
        // the first period has no prior position, so it only enters the curve
        let sharpe = daily.get(1..).map_or(f64::NAN, sharpe_ratio);
        Self::from_daily(&daily, sharpe, SignalCounts::tally(signals))
    }

    /// Always long, unlagged.
    pub fn buy_and_hold(returns: &[f64]) -> Result<Self, CopulaTraderError> {
        let counts = SignalCounts {
            long: returns.len(),
            ..SignalCounts::default()
        };
        Self::from_daily(returns, sharpe_ratio(returns), counts)
    }

    fn from_daily(
        daily: &[f64],
        sharpe_ratio: f64,
        counts: SignalCounts,
    ) -> Result<Self, CopulaTraderError> {
        if daily.is_empty() {
            return Err(CopulaTraderError::invalid_input(
                "cannot evaluate an empty return series",
            ));
        }

        let cumulative = cumulative_returns(daily);
        let final_value = cumulative[cumulative.len() - 1];

        Ok(Self {
            total_return: final_value - 1.0,
            annualized_return: annualized_return(&cumulative),
            sharpe_ratio,
            max_drawdown: max_drawdown(&cumulative),
            periods: daily.len(),
            counts,
            cumulative,
        })
    }
}

/// `r_s[0] = 0`, `r_s[t] = position(signal[t-1]) * r[t]`. Callers check
/// that both slices have the same length.
fn strategy_returns(signals: &[TradingSignal], returns: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(returns.len());
    if returns.is_empty() {
        return out;
    }
    out.push(0.0);
    for t in 1..returns.len() {
        out.push(signals[t - 1].position() * returns[t]);
    }
    out
}

/// Running product of `1 + r`; NaN returns count as zero.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0_f64, |acc, &r| {
            let r = if r.is_nan() { 0.0 } else { r };
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// `final^(252 / periods) - 1`
pub fn annualized_return(cumulative: &[f64]) -> f64 {
    match cumulative.last() {
        Some(&last) => last.powf(TRADING_DAYS_PER_YEAR / cumulative.len() as f64) - 1.0,
        None => f64::NAN,
    }
}

/// Mean over sample standard deviation, annualized. NaN when the deviation
/// is zero or undefined.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std_dev = returns.std_dev();
    if std_dev.is_nan() || std_dev <= ZERO_STD_TOLERANCE {
        return f64::NAN;
    }
    returns.mean() / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Most negative `(value - running_max) / running_max`; 0 for a curve that
/// never falls.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in cumulative {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (value - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}
