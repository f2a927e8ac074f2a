//! Domain error types.

/// Top-level error type for copulatrader.
///
/// Every variant is fatal to an analysis run. Numeric edge cases with a
/// defined value (an empty conditioning region, a zero-variance Sharpe ratio)
/// never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CopulaTraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data unavailable for {series}: {reason}")]
    DataUnavailable { series: String, reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("copula fit failed for ordering {ordering}: {reason}")]
    FitFailure { ordering: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CopulaTraderError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        CopulaTraderError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<&CopulaTraderError> for std::process::ExitCode {
    fn from(err: &CopulaTraderError) -> Self {
        let code: u8 = match err {
            CopulaTraderError::Io(_) => 1,
            CopulaTraderError::ConfigParse { .. }
            | CopulaTraderError::ConfigMissing { .. }
            | CopulaTraderError::ConfigInvalid { .. } => 2,
            CopulaTraderError::DataUnavailable { .. } => 3,
            CopulaTraderError::InvalidInput { .. } => 4,
            CopulaTraderError::FitFailure { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
