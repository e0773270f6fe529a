//! Configuration domain module
//!
//! Validated value objects for a forecast run, independent of where the
//! values come from (environment, CLI flags, callers).

pub mod forecast_config;

pub use forecast_config::{ForecastConfig, GradientBoostingSettings, RandomForestSettings};
