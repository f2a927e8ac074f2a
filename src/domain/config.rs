//! Analysis run parameters built from a [`ConfigPort`].

use crate::domain::cointegration::DEFAULT_SIGNIFICANCE;
use crate::domain::error::CopulaTraderError;
use crate::domain::ordering::{reference_orderings, VineOrdering};
use crate::domain::signal::{SignalThresholds, DEFAULT_OVERVALUED, DEFAULT_SAMPLES, DEFAULT_UNDERVALUED};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_OUTPUT: &str = "cumulative_returns.svg";

/// Which series the pairwise cointegration test runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CointegrationInput {
    Returns,
    Prices,
}

impl CointegrationInput {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "returns" => Some(CointegrationInput::Returns),
            "prices" | "levels" => Some(CointegrationInput::Prices),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub data_dir: PathBuf,
    pub series: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub benchmark: String,
    pub significance: f64,
    pub cointegration_input: CointegrationInput,
    pub orderings: Vec<VineOrdering>,
    pub n_samples: usize,
    pub seed: Option<u64>,
    pub thresholds: SignalThresholds,
    pub output: PathBuf,
}

pub fn build_analysis_config(adapter: &dyn ConfigPort) -> Result<AnalysisConfig, CopulaTraderError> {
    let series = adapter
        .get_list("data", "series")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CopulaTraderError::ConfigMissing {
            section: "data".into(),
            key: "series".into(),
        })?;

    let start_date = required_date(adapter, "start_date")?;
    let end_date = required_date(adapter, "end_date")?;

    let benchmark = match adapter.get_string("data", "benchmark") {
        Some(b) if !b.trim().is_empty() => b.trim().to_string(),
        _ => default_benchmark(&series),
    };

    let cointegration_input = match adapter.get_string("cointegration", "input") {
        None => CointegrationInput::Returns,
        Some(raw) => CointegrationInput::parse(&raw).ok_or_else(|| {
            CopulaTraderError::ConfigInvalid {
                section: "cointegration".into(),
                key: "input".into(),
                reason: format!("expected 'returns' or 'prices', got '{raw}'"),
            }
        })?,
    };

    let orderings = match adapter.get_list("copula", "orderings") {
        Some(list) if !list.is_empty() => list
            .iter()
            .map(|raw| {
                VineOrdering::parse(raw).map_err(|e| CopulaTraderError::ConfigInvalid {
                    section: "copula".into(),
                    key: "orderings".into(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => reference_orderings(series.len()),
    };

    ensure_numeric::<i64>(adapter, "copula", "n_samples")?;
    ensure_numeric::<f64>(adapter, "cointegration", "significance")?;
    ensure_numeric::<f64>(adapter, "signal", "overvalued")?;
    ensure_numeric::<f64>(adapter, "signal", "undervalued")?;

    let n_samples = adapter.get_int("copula", "n_samples", DEFAULT_SAMPLES as i64);
    let n_samples = usize::try_from(n_samples).map_err(|_| CopulaTraderError::ConfigInvalid {
        section: "copula".into(),
        key: "n_samples".into(),
        reason: "n_samples must be at least 1".into(),
    })?;

    let seed = match adapter.get_string("copula", "seed") {
        Some(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|_| {
            CopulaTraderError::ConfigInvalid {
                section: "copula".into(),
                key: "seed".into(),
                reason: format!("'{raw}' is not an unsigned integer"),
            }
        })?),
        _ => None,
    };

    let data_dir = adapter
        .get_string("data", "dir")
        .unwrap_or_else(|| "data".to_string());
    let output = adapter
        .get_string("report", "output")
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    Ok(AnalysisConfig {
        data_dir: PathBuf::from(data_dir),
        series,
        start_date,
        end_date,
        benchmark,
        significance: adapter.get_double("cointegration", "significance", DEFAULT_SIGNIFICANCE),
        cointegration_input,
        orderings,
        n_samples,
        seed,
        thresholds: SignalThresholds {
            overvalued: adapter.get_double("signal", "overvalued", DEFAULT_OVERVALUED),
            undervalued: adapter.get_double("signal", "undervalued", DEFAULT_UNDERVALUED),
        },
        output: PathBuf::from(output),
    })
}

/// Third series when there are at least three, otherwise the last one.
pub fn default_benchmark(series: &[String]) -> String {
    series
        .get(2)
        .or_else(|| series.last())
        .cloned()
        .unwrap_or_default()
}

/// Present but unparsable numbers are rejected rather than replaced by the
/// default the getters would fall back to.
fn ensure_numeric<T: FromStr>(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), CopulaTraderError> {
    match adapter.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() && raw.trim().parse::<T>().is_err() => {
            Err(CopulaTraderError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("'{}' is not a number", raw.trim()),
            })
        }
        _ => Ok(()),
    }
}

fn required_date(adapter: &dyn ConfigPort, key: &str) -> Result<NaiveDate, CopulaTraderError> {
    let raw = adapter
        .get_string("data", key)
        .ok_or_else(|| CopulaTraderError::ConfigMissing {
            section: "data".into(),
            key: key.into(),
        })?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| CopulaTraderError::ConfigInvalid {
        section: "data".into(),
        key: key.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const FULL: &str = r#"
[data]
dir = /tmp/fx
series = EURUSD=X, GBPUSD=X, USDJPY=X, AUDUSD=X
start_date = 2000-01-01
end_date = 2023-01-01
benchmark = AUDUSD=X

[cointegration]
significance = 0.01
input = prices

[copula]
orderings = 1-2-4-3, 1-3-4-2
n_samples = 500
seed = 42

[signal]
overvalued = 0.8
undervalued = 0.2

[report]
output = out/chart.svg
"#;

    #[test]
    fn builds_every_field() {
        let adapter = FileConfigAdapter::from_string(FULL).unwrap();
        let config = build_analysis_config(&adapter).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/fx"));
        assert_eq!(config.series, vec!["EURUSD=X", "GBPUSD=X", "USDJPY=X", "AUDUSD=X"]);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(config.benchmark, "AUDUSD=X");
        assert_eq!(config.significance, 0.01);
        assert_eq!(config.cointegration_input, CointegrationInput::Prices);
        let orders: Vec<String> = config.orderings.iter().map(|o| o.to_string()).collect();
        assert_eq!(orders, vec!["1-2-4-3", "1-3-4-2"]);
        assert_eq!(config.n_samples, 500);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.thresholds.overvalued, 0.8);
        assert_eq!(config.thresholds.undervalued, 0.2);
        assert_eq!(config.output, PathBuf::from("out/chart.svg"));
    }

    #[test]
    fn defaults_apply() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\nseries = A,B,C,D\nstart_date = 2020-01-01\nend_date = 2021-01-01\n",
        )
        .unwrap();
        let config = build_analysis_config(&adapter).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.benchmark, "C");
        assert_eq!(config.significance, DEFAULT_SIGNIFICANCE);
        assert_eq!(config.cointegration_input, CointegrationInput::Returns);
        assert_eq!(config.orderings, reference_orderings(4));
        assert_eq!(config.n_samples, DEFAULT_SAMPLES);
        assert_eq!(config.seed, None);
        assert_eq!(config.thresholds, SignalThresholds::default());
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn two_series_benchmark_is_last() {
        assert_eq!(default_benchmark(&["A".into(), "B".into()]), "B");
    }

    #[test]
    fn missing_series_fails() {
        let adapter =
            FileConfigAdapter::from_string("[data]\nstart_date = 2020-01-01\nend_date = 2021-01-01\n")
                .unwrap();
        let err = build_analysis_config(&adapter).unwrap_err();
        assert!(matches!(err, CopulaTraderError::ConfigMissing { key, .. } if key == "series"));
    }

    #[test]
    fn bad_date_fails() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\nseries = A,B\nstart_date = 2020/01/01\nend_date = 2021-01-01\n",
        )
        .unwrap();
        let err = build_analysis_config(&adapter).unwrap_err();
        assert!(matches!(err, CopulaTraderError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_ordering_fails() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\nseries = A,B,C\nstart_date = 2020-01-01\nend_date = 2021-01-01\n[copula]\norderings = 1-2-2\n",
        )
        .unwrap();
        let err = build_analysis_config(&adapter).unwrap_err();
        assert!(matches!(err, CopulaTraderError::ConfigInvalid { key, .. } if key == "orderings"));
    }

    #[test]
    fn negative_samples_fail() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\nseries = A,B\nstart_date = 2020-01-01\nend_date = 2021-01-01\n[copula]\nn_samples = -3\n",
        )
        .unwrap();
        let err = build_analysis_config(&adapter).unwrap_err();
        assert!(matches!(err, CopulaTraderError::ConfigInvalid { key, .. } if key == "n_samples"));
    }

    #[test]
    fn malformed_numbers_fail_instead_of_defaulting() {
        let cases = [
            ("signal", "overvalued", "0.7x"),
            ("signal", "undervalued", "low"),
            ("cointegration", "significance", "5%"),
            ("copula", "n_samples", "1e4"),
        ];
        for (section, key, value) in cases {
            let ini = format!(
                "[data]\nseries = A,B\nstart_date = 2020-01-01\nend_date = 2021-01-01\n[{section}]\n{key} = {value}\n"
            );
            let adapter = FileConfigAdapter::from_string(&ini).unwrap();
            let err = build_analysis_config(&adapter).unwrap_err();
            assert!(
                matches!(err, CopulaTraderError::ConfigInvalid { key: ref k, .. } if k == key),
                "{key} = {value}: {err:?}"
            );
        }
    }

    #[test]
    fn blank_numbers_use_defaults() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\nseries = A,B\nstart_date = 2020-01-01\nend_date = 2021-01-01\n[signal]\novervalued =\n",
        )
        .unwrap();
        let config = build_analysis_config(&adapter).unwrap();
        assert_eq!(config.thresholds.overvalued, DEFAULT_OVERVALUED);
    }

    #[test]
    fn unknown_input_kind_fails() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\nseries = A,B\nstart_date = 2020-01-01\nend_date = 2021-01-01\n[cointegration]\ninput = spreads\n",
        )
        .unwrap();
        assert!(build_analysis_config(&adapter).is_err());
    }
}
