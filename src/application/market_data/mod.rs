// Market data processing modules
pub mod signal_generator;
pub mod technical_analysis;
