// Configuration value objects
pub mod config;

// Domain-specific error types
pub mod errors;

// Price history
pub mod market;

// Feature schema and forecast results
pub mod ml;

// Port interfaces
pub mod ports;
