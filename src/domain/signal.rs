//! Copula-conditional trading signals.
//!
//! One Monte Carlo draw from the fitted copula is shared by every historical
//! row. For a row `x`, the draw is filtered to samples whose non-pivotal
//! coordinates are all `<=` those of `x`; the share of survivors whose pivotal
//! coordinate is `<= x[pivotal]` estimates the conditional CDF, which the
//! thresholds turn into a position.

use crate::domain::error::CopulaTraderError;
use crate::domain::rank::RankMatrix;
use crate::ports::copula_port::CopulaFitter;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::fmt;

pub const DEFAULT_SAMPLES: usize = 10_000;
pub const DEFAULT_OVERVALUED: f64 = 0.75;
pub const DEFAULT_UNDERVALUED: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradingSignal {
    Long,
    Short,
    Neutral,
}

impl TradingSignal {
    pub fn position(self) -> f64 {
        match self {
            TradingSignal::Long => 1.0,
            TradingSignal::Short => -1.0,
            TradingSignal::Neutral => 0.0,
        }
    }
}

impl fmt::Display for TradingSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradingSignal::Long => "long",
            TradingSignal::Short => "short",
            TradingSignal::Neutral => "neutral",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    pub overvalued: f64,
    pub undervalued: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            overvalued: DEFAULT_OVERVALUED,
            undervalued: DEFAULT_UNDERVALUED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalCounts {
    pub long: usize,
    pub short: usize,
    pub neutral: usize,
}

impl SignalCounts {
    pub fn tally(signals: &[TradingSignal]) -> Self {
        signals.iter().fold(Self::default(), |mut acc, s| {
            match s {
                TradingSignal::Long => acc.long += 1,
                TradingSignal::Short => acc.short += 1,
                TradingSignal::Neutral => acc.neutral += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConditionalSignals {
    pub cdf_values: Vec<f64>,
    pub signals: Vec<TradingSignal>,
}

/// `c > overvalued` is Short, `c < undervalued` is Long, boundaries are Neutral.
pub fn classify(cdf: f64, thresholds: &SignalThresholds) -> TradingSignal {
    if cdf > thresholds.overvalued {
        TradingSignal::Short
    } else if cdf < thresholds.undervalued {
        TradingSignal::Long
    } else {
        TradingSignal::Neutral
    }
}

/// Empirical `P(U_p <= x_p | U_j <= x_j for all j != p)` over `samples`.
///
/// An empty conditioning region yields 0.0.
pub fn conditional_cdf(samples: &[Vec<f64>], row: &[f64], pivotal: usize) -> f64 {
    let mut region = 0usize;
    let mut below = 0usize;

    for sample in samples {
        let inside = sample
            .iter()
            .zip(row)
            .enumerate()
            .all(|(j, (s, x))| j == pivotal || s <= x);
        if inside {
            region += 1;
            if sample[pivotal] <= row[pivotal] {
                below += 1;
            }
        }
    }

    if region == 0 {
        0.0
    } else {
        below as f64 / region as f64
    }
}

/// Classifies every row of `ranks` against one shared simulation of `model`.
pub fn generate_signals<F>(
    fitter: &F,
    model: &F::Model,
    ranks: &RankMatrix,
    pivotal: usize,
    n_samples: usize,
    thresholds: &SignalThresholds,
    rng: &mut StdRng,
) -> Result<ConditionalSignals, CopulaTraderError>
where
    F: CopulaFitter,
{
    if n_samples == 0 {
        return Err(CopulaTraderError::invalid_input(
            "sample count must be at least 1",
        ));
    }
    if pivotal >= ranks.cols() {
        return Err(CopulaTraderError::invalid_input(format!(
            "pivotal column {} out of range for {} series",
            pivotal,
            ranks.cols()
        )));
    }

    let samples = fitter.simulate(model, n_samples, rng)?;
    if samples.iter().any(|s| s.len() != ranks.cols()) {
        return Err(CopulaTraderError::invalid_input(format!(
            "simulated samples do not have {} coordinates",
            ranks.cols()
        )));
    }
    log::info!(
        "estimating conditional CDF for {} rows against {} samples",
        ranks.rows(),
        samples.len()
    );

    let rows = ranks.to_rows();
    let cdf_values: Vec<f64> = rows
        .par_iter()
        .map(|row| conditional_cdf(&samples, row, pivotal))
        .collect();
    let signals = cdf_values
        .iter()
        .map(|&c| classify(c, thresholds))
        .collect();

    Ok(ConditionalSignals {
        cdf_values,
        signals,
    })
}
