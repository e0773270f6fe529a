//! Configuration module for the forecaster.
//!
//! Loads run parameters and model hyperparameters from environment
//! variables and converts them into the validated `ForecastConfig`.

mod forecast_env_config;
mod model_env_config;

pub use forecast_env_config::{APP_HORIZON_RANGE, ForecastEnvConfig};
pub use model_env_config::ModelEnvConfig;

use crate::domain::config::ForecastConfig;
use crate::domain::ml::forecast::ModelType;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub forecast: ForecastEnvConfig,
    pub models: ModelEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let forecast =
            ForecastEnvConfig::from_lookup(lookup).context("Failed to load forecast config")?;
        let models = ModelEnvConfig::from_lookup(lookup).context("Failed to load model config")?;
        Ok(Self { forecast, models })
    }

    /// Create a ForecastConfig domain value object from this Config
    pub fn to_forecast_config(&self) -> Result<ForecastConfig> {
        ForecastConfig::new(
            ModelType::parse(&self.forecast.model_type),
            self.forecast.horizon_days,
        )
        .and_then(|c| c.with_test_fraction(self.forecast.test_fraction))
        .and_then(|c| c.with_random_forest(self.models.random_forest()))
        .and_then(|c| c.with_gradient_boosting(self.models.gradient_boosting()))
        .map_err(|e| anyhow::anyhow!("Invalid forecast config: {}", e))
    }
}

fn parse_var<T>(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}
