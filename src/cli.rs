//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvMarketData;
use crate::adapters::engle_granger::EngleGrangerTest;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_report_adapter::SvgReportAdapter;
use crate::adapters::vine_copula::CVineFitter;
use crate::domain::analysis::{self, AnalysisReport};
use crate::domain::cointegration::PairCointegration;
use crate::domain::config::{build_analysis_config, AnalysisConfig};
use crate::domain::config_validation::validate_analysis_config;
use crate::domain::error::CopulaTraderError;
use crate::domain::metrics::PerformanceReport;
use crate::domain::returns::ReturnMatrix;
use crate::ports::data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "copulatrader",
    about = "C-vine copula statistical arbitrage analysis"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full analysis and write the cumulative return chart
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [report] output
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overrides [copula] seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Pairwise cointegration diagnostics only
    Cointegration {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Check the configuration and that every series loads
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the series available in a data directory
    ListSeries {
        #[arg(long)]
        data_dir: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Analyze {
            config,
            output,
            seed,
        } => run_analyze(&config, output, seed),
        Command::Cointegration { config } => run_cointegration(&config),
        Command::Validate { config } => run_validate(&config),
        Command::ListSeries { data_dir } => run_list_series(&data_dir),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Reads, builds and validates the analysis configuration at `path`.
pub fn load_analysis_config(path: &Path) -> Result<AnalysisConfig, CopulaTraderError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    let config = build_analysis_config(&adapter)?;
    validate_analysis_config(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut AnalysisConfig, output: Option<PathBuf>, seed: Option<u64>) {
    if let Some(output) = output {
        config.output = output;
    }
    if seed.is_some() {
        config.seed = seed;
    }
}

fn run_analyze(
    config_path: &Path,
    output: Option<PathBuf>,
    seed: Option<u64>,
) -> Result<(), CopulaTraderError> {
    let mut config = load_analysis_config(config_path)?;
    apply_overrides(&mut config, output, seed);

    let report = analyze(&config)?;
    println!("{}", format_summary(&report));

    SvgReportAdapter::new().write(&report, &config.output.to_string_lossy())?;
    eprintln!("Chart written to {}", config.output.display());
    Ok(())
}

/// Runs the pipeline with the CSV, Engle-Granger and C-vine adapters.
pub fn analyze(config: &AnalysisConfig) -> Result<AnalysisReport, CopulaTraderError> {
    let data = CsvMarketData::new(config.data_dir.clone());
    let mut rng = analysis::rng_for(config);
    eprintln!(
        "Analyzing {} series over {} candidate orderings ({} samples)",
        config.series.len(),
        config.orderings.len(),
        config.n_samples
    );
    analysis::run_analysis(
        &data,
        &EngleGrangerTest::new(),
        &CVineFitter::new(),
        config,
        &mut rng,
    )
}

fn run_cointegration(config_path: &Path) -> Result<(), CopulaTraderError> {
    let config = load_analysis_config(config_path)?;
    let data = CsvMarketData::new(config.data_dir.clone());
    let set = analysis::load_series_set(&data, &config)?;
    let returns = ReturnMatrix::from_series(&set)?;
    let results = analysis::run_cointegration(&EngleGrangerTest::new(), &set, &returns, &config)?;
    println!("{}", format_cointegration(&results));
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), CopulaTraderError> {
    let config = load_analysis_config(config_path)?;
    eprintln!("Config validated successfully");

    let data = CsvMarketData::new(config.data_dir.clone());
    let set = analysis::load_series_set(&data, &config)?;
    println!(
        "{} series aligned on {} dates ({} to {})",
        set.series_count(),
        set.len(),
        set.dates.first().map(|d| d.to_string()).unwrap_or_default(),
        set.dates.last().map(|d| d.to_string()).unwrap_or_default()
    );
    println!("Benchmark: {}", config.benchmark);
    println!("Candidate orderings:");
    for ordering in &config.orderings {
        println!("  {ordering}");
    }
    Ok(())
}

fn run_list_series(data_dir: &Path) -> Result<(), CopulaTraderError> {
    let names = CsvMarketData::new(data_dir.to_path_buf()).list_series()?;
    if names.is_empty() {
        eprintln!("No series found in {}", data_dir.display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub fn format_cointegration(results: &[PairCointegration]) -> String {
    results
        .iter()
        .map(|r| r.verdict_line())
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_performance(label: &str, perf: &PerformanceReport) -> String {
    format!(
        "{label}:\n  Annualized return: {:.2}%\n  Sharpe ratio: {:.4}\n  Max drawdown: {:.2}%\n  Total return: {:.2}%",
        perf.annualized_return * 100.0,
        perf.sharpe_ratio,
        perf.max_drawdown * 100.0,
        perf.total_return * 100.0
    )
}

/// Console summary of an analysis run.
pub fn format_summary(report: &AnalysisReport) -> String {
    let mut lines = vec![format_cointegration(&report.cointegration), String::new()];

    for candidate in &report.candidates {
        lines.push(format!(
            "Order {}: log-likelihood {:.4}",
            candidate.ordering, candidate.log_likelihood
        ));
    }
    lines.push(format!(
        "Best order: {} (log-likelihood {:.4})",
        report.ordering, report.log_likelihood
    ));

    let others: Vec<&str> = report
        .series
        .iter()
        .filter(|s| **s != report.pivotal)
        .map(String::as_str)
        .collect();
    lines.push(format!(
        "Pivotal series: {} conditioned on {}",
        report.pivotal,
        others.join(", ")
    ));
    lines.push(String::new());

    lines.push(format_performance(
        &format!("Copula strategy ({})", report.pivotal),
        &report.strategy,
    ));
    lines.push(format_performance(
        &format!("Buy and hold ({})", report.benchmark),
        &report.buy_and_hold,
    ));

    let counts = &report.strategy.counts;
    lines.push(format!(
        "Positions: {} long, {} short, {} neutral",
        counts.long, counts.short, counts.neutral
    ));
    lines.join("\n")
}
