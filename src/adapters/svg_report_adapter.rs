//! SVG report adapter implementing ReportPort.
//!
//! Draws the strategy and buy-and-hold cumulative-return curves on one set of
//! axes, with a legend and a caption carrying the headline metrics.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::analysis::AnalysisReport;
use crate::domain::error::CopulaTraderError;
use crate::domain::metrics::PerformanceReport;
use crate::ports::report_port::ReportPort;

const CHART_WIDTH: f64 = 720.0;
const CHART_HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 90.0;

const STRATEGY_COLOR: &str = "#2563eb";
const BENCHMARK_COLOR: &str = "#dc2626";

pub struct SvgReportAdapter;

impl SvgReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SvgReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for SvgReportAdapter {
    fn write(&self, report: &AnalysisReport, output_path: &str) -> Result<(), CopulaTraderError> {
        let svg = render_cumulative_svg(report);
        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, svg)?;
        log::info!("wrote cumulative return chart to {}", path.display());
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn fmt_pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn fmt_ratio(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "n/a".to_string()
    }
}

fn metrics_line(label: &str, perf: &PerformanceReport) -> String {
    format!(
        "{}: annualized {}, Sharpe {}, max drawdown {}",
        label,
        fmt_pct(perf.annualized_return),
        fmt_ratio(perf.sharpe_ratio),
        fmt_pct(perf.max_drawdown)
    )
}

fn path_data(values: &[f64], x_scale: impl Fn(usize) -> f64, y_scale: impl Fn(f64) -> f64) -> String {
    let mut data = String::new();
    for (i, &v) in values.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { " L" };
        data.push_str(&format!("{} {:.1} {:.1}", cmd, x_scale(i), y_scale(v)));
    }
    data
}

/// Standalone SVG document for `report`.
pub fn render_cumulative_svg(report: &AnalysisReport) -> String {
    let strategy = &report.strategy.cumulative;
    let benchmark = &report.buy_and_hold.cumulative;
    let points = strategy.len().max(benchmark.len());

    let finite = || strategy.iter().chain(benchmark).copied().filter(|v| v.is_finite());
    let min_value = finite().fold(1.0, f64::min);
    let max_value = finite().fold(1.0, f64::max);
    let range = (max_value - min_value).max(1e-6);

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let x_scale = |i: usize| MARGIN_LEFT + (i as f64 / (points.max(2) - 1) as f64) * plot_width;
    let y_scale = |v: f64| MARGIN_TOP + plot_height - ((v - min_value) / range) * plot_height;

    let mut svg = String::new();
    svg.push_str(&format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"20\" text-anchor=\"middle\" font-size=\"14\">Cumulative Returns (vine order {})</text>\n",
        CHART_WIDTH / 2.0,
        report.ordering
    ));

    // axes
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        MARGIN_TOP,
        MARGIN_LEFT,
        MARGIN_TOP + plot_height
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        MARGIN_TOP + plot_height,
        CHART_WIDTH - MARGIN_RIGHT,
        MARGIN_TOP + plot_height
    ));
    // break-even
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{:.1}\" x2=\"{}\" y2=\"{:.1}\" stroke=\"#eee\" stroke-dasharray=\"4 4\"/>\n",
        MARGIN_LEFT,
        y_scale(1.0),
        CHART_WIDTH - MARGIN_RIGHT,
        y_scale(1.0)
    ));
    for (value, y) in [
        (max_value, MARGIN_TOP + 5.0),
        ((max_value + min_value) / 2.0, MARGIN_TOP + plot_height / 2.0),
        (min_value, MARGIN_TOP + plot_height - 5.0),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{:.3}</text>\n",
            MARGIN_LEFT - 5.0,
            y,
            value
        ));
    }

    let date_at = |i: usize| -> Option<NaiveDate> { report.dates.get(i).copied() };
    if let (Some(first), Some(last)) = (date_at(0), report.dates.last().copied()) {
        let mid = date_at(report.dates.len() / 2).unwrap_or(first);
        for (x, date) in [
            (MARGIN_LEFT, first),
            (MARGIN_LEFT + plot_width / 2.0, mid),
            (CHART_WIDTH - MARGIN_RIGHT, last),
        ] {
            svg.push_str(&format!(
                "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"10\" fill=\"#666\">{}</text>\n",
                x,
                MARGIN_TOP + plot_height + 15.0,
                date
            ));
        }
    }

    for (values, color) in [(benchmark, BENCHMARK_COLOR), (strategy, STRATEGY_COLOR)] {
        if values.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>\n",
            path_data(values, &x_scale, &y_scale),
            color
        ));
    }

    // legend
    let strategy_label = format!("Copula strategy ({})", escape(&report.pivotal));
    let benchmark_label = format!("Buy and hold ({})", escape(&report.benchmark));
    for (row, (label, color)) in [
        (&strategy_label, STRATEGY_COLOR),
        (&benchmark_label, BENCHMARK_COLOR),
    ]
    .into_iter()
    .enumerate()
    {
        let y = MARGIN_TOP + 12.0 + row as f64 * 16.0;
        svg.push_str(&format!(
            "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"2\"/>\n",
            MARGIN_LEFT + 10.0,
            y - 4.0,
            MARGIN_LEFT + 30.0,
            y - 4.0,
            color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"11\">{}</text>\n",
            MARGIN_LEFT + 35.0,
            y,
            label
        ));
    }

    // caption
    let caption_top = MARGIN_TOP + plot_height + 40.0;
    for (row, line) in [
        metrics_line("Strategy", &report.strategy),
        metrics_line("Buy and hold", &report.buy_and_hold),
    ]
    .iter()
    .enumerate()
    {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"#333\">{}</text>\n",
            MARGIN_LEFT,
            caption_top + row as f64 * 16.0,
            line
        ));
    }

    svg.push_str("</svg>\n");
    svg
}
