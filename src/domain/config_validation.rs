//! Configuration validation.
//!
//! Checks a built [`AnalysisConfig`] before any data is loaded.

use crate::domain::config::AnalysisConfig;
use crate::domain::error::CopulaTraderError;
use std::collections::HashSet;

pub fn validate_analysis_config(config: &AnalysisConfig) -> Result<(), CopulaTraderError> {
    validate_series(config)?;
    validate_dates(config)?;
    validate_benchmark(config)?;
    validate_significance(config)?;
    validate_samples(config)?;
    validate_thresholds(config)?;
    validate_orderings(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> CopulaTraderError {
    CopulaTraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_series(config: &AnalysisConfig) -> Result<(), CopulaTraderError> {
    if config.series.len() < 2 {
        return Err(invalid("data", "series", "at least 2 series are required"));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = config.series.iter().find(|s| !seen.insert(s.as_str())) {
        return Err(invalid("data", "series", format!("series '{dup}' is listed twice")));
    }
    Ok(())
}

fn validate_dates(config: &AnalysisConfig) -> Result<(), CopulaTraderError> {
    if config.start_date >= config.end_date {
        return Err(invalid("data", "start_date", "start_date must be before end_date"));
    }
    Ok(())
}

fn validate_benchmark(config: &AnalysisConfig) -> Result<(), CopulaTraderError> {
    if !config.series.contains(&config.benchmark) {
        return Err(invalid(
            "data",
            "benchmark",
            format!("benchmark '{}' is not one of the series", config.benchmark),
        ));
    }
    Ok(())
}

fn validate_significance(config: &AnalysisConfig) -> Result<(), CopulaTraderError> {
    let value = config.significance;
    if !(value > 0.0 && value < 1.0) {
        return Err(invalid(
            "cointegration",
            "significance",
            "significance must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_samples(config: &AnalysisConfig) -> Result<(), CopulaTraderError> {
    if config.n_samples < 1 {
        return Err(invalid("copula", "n_samples", "n_samples must be at least 1"));
    }
    Ok(())
}

fn validate_thresholds(config: &AnalysisConfig) -> Result<(), CopulaTraderError> {
    let t = &config.thresholds;
    if !(0.0..=1.0).contains(&t.overvalued) {
        return Err(invalid("signal", "overvalued", "overvalued must be within [0, 1]"));
    }
    if !(0.0..=1.0).contains(&t.undervalued) {
        return Err(invalid("signal", "undervalued", "undervalued must be within [0, 1]"));
    }
    if t.undervalued > t.overvalued {
        return Err(invalid(
            "signal",
            "undervalued",
            "undervalued must not exceed overvalued",
        ));
    }
    Ok(())
}

fn validate_orderings(config: &AnalysisConfig) -> Result<(), CopulaTraderError> {
    if config.orderings.is_empty() {
        return Err(invalid("copula", "orderings", "no candidate orderings"));
    }
    let k = config.series.len();
    if let Some(bad) = config.orderings.iter().find(|o| o.len() != k) {
        return Err(invalid(
            "copula",
            "orderings",
            format!("ordering {bad} does not cover {k} series"),
        ));
    }
    Ok(())
}
