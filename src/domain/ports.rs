use crate::domain::market::price_series::PriceSeries;
use anyhow::Result;

/// Supplier of daily price history, ascending by date.
pub trait PriceHistorySource: Send + Sync {
    fn load_history(&self, symbol: &str) -> Result<PriceSeries>;
}
