//! Daily OHLCV price history.
//!
//! A `PriceSeries` is the immutable input of the forecasting pipeline. It is
//! produced by an external market-data source and validated once here so the
//! indicator and feature code can assume ordered, finite data.

use crate::domain::errors::PriceSeriesError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price (H + L + C) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Ordered-by-date sequence of bars.
///
/// # Invariants
///
/// - Dates are strictly increasing (no duplicates)
/// - Every numeric field is finite
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, PriceSeriesError> {
        for bar in &bars {
            if let Some(field) = bar.first_non_finite() {
                return Err(PriceSeriesError::NonFinite {
                    date: bar.date,
                    field,
                });
            }
        }

        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(PriceSeriesError::OutOfOrder {
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }

        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Highest high and lowest low over the whole series
    pub fn price_range(&self) -> Option<(f64, f64)> {
        if self.bars.is_empty() {
            return None;
        }
        let high = self
            .bars
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let low = self.bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        Some((high, low))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn bar(d: u32, close: f64) -> PriceBar {
        PriceBar::new(day(d), close, close + 1.0, close - 1.0, close, 1_000.0)
    }

    #[test]
    fn test_valid_series() {
        let series = PriceSeries::new(vec![bar(2, 10.0), bar(3, 11.0), bar(4, 12.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
        assert_eq!(series.last().unwrap().date, day(4));
        assert_eq!(series.price_range(), Some((13.0, 9.0)));
    }

    #[test]
    fn test_rejects_duplicate_dates() {
        let result = PriceSeries::new(vec![bar(2, 10.0), bar(2, 11.0)]);
        assert_eq!(
            result,
            Err(PriceSeriesError::OutOfOrder {
                previous: day(2),
                current: day(2),
            })
        );
    }

    #[test]
    fn test_rejects_descending_dates() {
        assert!(PriceSeries::new(vec![bar(5, 10.0), bar(3, 11.0)]).is_err());
    }

    #[test]
    fn test_rejects_nan() {
        let mut bad = bar(3, 10.0);
        bad.volume = f64::NAN;
        let result = PriceSeries::new(vec![bar(2, 10.0), bad]);
        assert_eq!(
            result,
            Err(PriceSeriesError::NonFinite {
                date: day(3),
                field: "volume",
            })
        );
    }

    #[test]
    fn test_empty_series_is_valid() {
        let series = PriceSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.price_range().is_none());
    }

    #[test]
    fn test_typical_price() {
        let b = PriceBar::new(day(2), 10.0, 12.0, 9.0, 11.0, 0.0);
        assert!((b.typical_price() - 32.0 / 3.0).abs() < 1e-12);
    }
}
