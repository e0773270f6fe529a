use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while validating a price history
#[derive(Debug, Error, PartialEq)]
pub enum PriceSeriesError {
    #[error("Non-finite {field} on {date}")]
    NonFinite { date: NaiveDate, field: &'static str },

    #[error("Bars out of order: {current} does not follow {previous}")]
    OutOfOrder {
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Errors related to forecast configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ForecastConfigError {
    #[error(
        "Invalid horizon: {0} days. Must be between 1 and {max}",
        max = crate::domain::config::forecast_config::MAX_HORIZON_DAYS
    )]
    InvalidHorizon(usize),

    #[error("Invalid test fraction: {0}. Must be in (0, 1)")]
    InvalidTestFraction(f64),

    #[error("Invalid {field}: {value}. Must be >= 1")]
    InvalidEnsembleSize { field: &'static str, value: usize },

    #[error("Invalid learning rate: {0}. Must be in (0, 1]")]
    InvalidLearningRate(f64),
}

/// Errors raised by the feature pipeline and the forecast engine
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Insufficient data at {stage}: {rows} usable rows")]
    InsufficientData { stage: &'static str, rows: usize },

    #[error("Training failed for {model}: {reason}")]
    Training { model: String, reason: String },

    #[error("Unsupported model type: {0}")]
    UnsupportedModel(String),

    #[error("Invalid price series: {0}")]
    InvalidSeries(#[from] PriceSeriesError),
}

impl ForecastError {
    pub fn training(model: impl Into<String>, reason: impl ToString) -> Self {
        ForecastError::Training {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the recoverable "not enough history" condition
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ForecastError::InsufficientData { .. })
    }
}
