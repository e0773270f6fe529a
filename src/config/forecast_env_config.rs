//! Forecast run parameters from environment variables.

use super::parse_var;
use anyhow::Result;
use tracing::warn;

/// Horizon range offered by the application's prediction page
pub const APP_HORIZON_RANGE: std::ops::RangeInclusive<usize> = 7..=90;

#[derive(Debug, Clone)]
pub struct ForecastEnvConfig {
    pub model_type: String,
    pub horizon_days: usize,
    pub test_fraction: f64,
}

impl Default for ForecastEnvConfig {
    fn default() -> Self {
        Self {
            model_type: "random_forest".to_string(),
            horizon_days: 30,
            test_fraction: 0.2,
        }
    }
}

impl ForecastEnvConfig {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            model_type: lookup("FORECAST_MODEL_TYPE").unwrap_or(defaults.model_type),
            horizon_days: parse_var(lookup, "FORECAST_HORIZON_DAYS", defaults.horizon_days)?,
            test_fraction: parse_var(lookup, "FORECAST_TEST_FRACTION", defaults.test_fraction)?,
        };

        if !APP_HORIZON_RANGE.contains(&config.horizon_days) {
            warn!(
                "FORECAST_HORIZON_DAYS={} is outside the usual {}-{} day range",
                config.horizon_days,
                APP_HORIZON_RANGE.start(),
                APP_HORIZON_RANGE.end()
            );
        }

        Ok(config)
    }
}
