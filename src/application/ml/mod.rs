pub mod calendar;
pub mod feature_builder;
pub mod forecast_engine;
pub mod metrics;
pub mod regressor;

pub use feature_builder::FeatureBuilder;
pub use forecast_engine::ForecastEngine;
