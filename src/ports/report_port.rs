//! Report output port trait.

use crate::domain::analysis::AnalysisReport;
use crate::domain::error::CopulaTraderError;

/// Port for rendering the outcome of an analysis run.
pub trait ReportPort {
    fn write(&self, report: &AnalysisReport, output_path: &str) -> Result<(), CopulaTraderError>;
}
