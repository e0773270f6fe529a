// Indicator math and dashboard signals
pub mod market_data;

// Feature engineering, models and the forecast pipeline
pub mod ml;
