//! End-to-end analysis pipeline.
//!
//! prices -> aligned set -> returns -> (cointegration diagnostics, ranks) ->
//! structure selection -> conditional signals -> strategy and benchmark
//! performance.

use crate::domain::cointegration::{check_pairs, PairCointegration};
use crate::domain::config::{AnalysisConfig, CointegrationInput};
use crate::domain::error::CopulaTraderError;
use crate::domain::metrics::PerformanceReport;
use crate::domain::ordering::VineOrdering;
use crate::domain::rank::rank_matrix;
use crate::domain::returns::ReturnMatrix;
use crate::domain::selection::{select_structure, CandidateScore};
use crate::domain::series::SeriesSet;
use crate::domain::signal::{generate_signals, TradingSignal};
use crate::ports::cointegration_port::CointegrationTest;
use crate::ports::copula_port::CopulaFitter;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Everything one analysis run produces.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub series: Vec<String>,
    /// Dates of the return rows (the first aligned date is dropped).
    pub dates: Vec<NaiveDate>,
    pub cointegration: Vec<PairCointegration>,
    pub ordering: VineOrdering,
    pub log_likelihood: f64,
    pub candidates: Vec<CandidateScore>,
    pub pivotal: String,
    pub benchmark: String,
    pub cdf_values: Vec<f64>,
    pub signals: Vec<TradingSignal>,
    pub strategy: PerformanceReport,
    pub buy_and_hold: PerformanceReport,
}

/// Seeded when the config carries a seed, entropy otherwise.
pub fn rng_for(config: &AnalysisConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn load_series_set(
    data: &dyn MarketDataPort,
    config: &AnalysisConfig,
) -> Result<SeriesSet, CopulaTraderError> {
    let mut series = Vec::with_capacity(config.series.len());
    for name in &config.series {
        let s = data.fetch_closes(name, config.start_date, config.end_date)?;
        log::info!("loaded {} closes for {}", s.len(), name);
        series.push(s);
    }
    let set = SeriesSet::align(&series)?;
    log::info!(
        "aligned {} series on {} dates",
        set.series_count(),
        set.len()
    );
    Ok(set)
}

/// Pairwise cointegration on the configured input (returns or price levels).
pub fn run_cointegration(
    test: &dyn CointegrationTest,
    set: &SeriesSet,
    returns: &ReturnMatrix,
    config: &AnalysisConfig,
) -> Result<Vec<PairCointegration>, CopulaTraderError> {
    let columns = match config.cointegration_input {
        CointegrationInput::Returns => &returns.columns,
        CointegrationInput::Prices => &set.closes,
    };
    check_pairs(test, &set.names, columns, config.significance)
}

pub fn run_analysis<F: CopulaFitter>(
    data: &dyn MarketDataPort,
    test: &dyn CointegrationTest,
    fitter: &F,
    config: &AnalysisConfig,
    rng: &mut StdRng,
) -> Result<AnalysisReport, CopulaTraderError> {
    let set = load_series_set(data, config)?;
    let returns = ReturnMatrix::from_series(&set)?;
    let cointegration = run_cointegration(test, &set, &returns, config)?;

    let ranks = rank_matrix(&returns)?;
    log::info!(
        "fitting {} candidate orderings on {} x {} ranks",
        config.orderings.len(),
        ranks.rows(),
        ranks.cols()
    );
    let selection = select_structure(fitter, &config.orderings, &ranks)?;
    let pivotal_col = selection.pivotal_column();
    let pivotal = returns.names[pivotal_col].clone();

    let conditional = generate_signals(
        fitter,
        &selection.model,
        &ranks,
        pivotal_col,
        config.n_samples,
        &config.thresholds,
        rng,
    )?;

    let benchmark_returns = returns.column(&config.benchmark).ok_or_else(|| {
        CopulaTraderError::invalid_input(format!(
            "benchmark {} is not among the loaded series",
            config.benchmark
        ))
    })?;
    let strategy = PerformanceReport::strategy(&conditional.signals, &returns.columns[pivotal_col])?;
    let buy_and_hold = PerformanceReport::buy_and_hold(benchmark_returns)?;
    log::info!(
        "strategy on {pivotal}: total return {:.4}, benchmark {}: {:.4}",
        strategy.total_return,
        config.benchmark,
        buy_and_hold.total_return
    );

    Ok(AnalysisReport {
        series: returns.names.clone(),
        dates: returns.dates.clone(),
        cointegration,
        ordering: selection.ordering,
        log_likelihood: selection.log_likelihood,
        candidates: selection.candidates,
        pivotal,
        benchmark: config.benchmark.clone(),
        cdf_values: conditional.cdf_values,
        signals: conditional.signals,
        strategy,
        buy_and_hold,
    })
}
