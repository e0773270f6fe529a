//! Dashboard signals derived from an indicator table: RSI extremes, MACD and
//! moving-average crossovers, Bollinger breaches, plus support/resistance and
//! Fibonacci retracement levels.

use crate::application::market_data::technical_analysis::{IndicatorSeries, IndicatorTable};
use crate::domain::market::price_series::PriceSeries;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSignal {
    pub indicator: &'static str,
    pub signal: Signal,
    pub reason: &'static str,
}

impl IndicatorSignal {
    fn new(indicator: &'static str, signal: Signal, reason: &'static str) -> Self {
        Self {
            indicator,
            signal,
            reason,
        }
    }
}

pub struct SignalGenerator {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalGenerator {
    pub fn new() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        }
    }

    /// Evaluate the latest bar of `table`. Indicators without enough history
    /// are skipped rather than reported as neutral.
    pub fn generate(&self, table: &IndicatorTable, closes: &[f64]) -> Vec<IndicatorSignal> {
        let mut signals = Vec::new();

        if let Some(rsi) = table.get("rsi").and_then(|s| s.last().copied().flatten()) {
            signals.push(if rsi > self.rsi_overbought {
                IndicatorSignal::new("rsi", Signal::Sell, "Overbought")
            } else if rsi < self.rsi_oversold {
                IndicatorSignal::new("rsi", Signal::Buy, "Oversold")
            } else {
                IndicatorSignal::new("rsi", Signal::Neutral, "Within range")
            });
        }

        if let (Some(macd), Some(signal)) = (table.get("macd"), table.get("macd_signal")) {
            if let Some(s) = crossover("macd", macd, signal, "Bullish Crossover", "Bearish Crossover")
            {
                signals.push(s);
            }
        }

        if let (Some(fast), Some(slow)) = (table.get("sma_20"), table.get("sma_50")) {
            if let Some(s) = crossover("moving_average", fast, slow, "Golden Cross", "Death Cross") {
                signals.push(s);
            }
        }

        if let (Some(upper), Some(lower), Some(&close)) = (
            table.get("bb_upper").and_then(|s| s.last().copied().flatten()),
            table.get("bb_lower").and_then(|s| s.last().copied().flatten()),
            closes.last(),
        ) {
            signals.push(if close > upper {
                IndicatorSignal::new("bollinger_bands", Signal::Sell, "Above Upper Band")
            } else if close < lower {
                IndicatorSignal::new("bollinger_bands", Signal::Buy, "Below Lower Band")
            } else {
                IndicatorSignal::new("bollinger_bands", Signal::Neutral, "Inside Bands")
            });
        }

        signals
    }
}

/// Cross of `fast` over `slow` between the last two bars
fn crossover(
    indicator: &'static str,
    fast: &IndicatorSeries,
    slow: &IndicatorSeries,
    bullish: &'static str,
    bearish: &'static str,
) -> Option<IndicatorSignal> {
    let n = fast.len().min(slow.len());
    if n < 2 {
        return None;
    }
    let (f_prev, f_now) = (fast[n - 2]?, fast[n - 1]?);
    let (s_prev, s_now) = (slow[n - 2]?, slow[n - 1]?);

    Some(if f_now > s_now && f_prev <= s_prev {
        IndicatorSignal::new(indicator, Signal::Buy, bullish)
    } else if f_now < s_now && f_prev >= s_prev {
        IndicatorSignal::new(indicator, Signal::Sell, bearish)
    } else {
        IndicatorSignal::new(indicator, Signal::Neutral, "No Crossover")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupportResistance {
    /// Up to five levels, highest first
    pub resistance: Vec<f64>,
    /// Up to five levels, highest last
    pub support: Vec<f64>,
}

/// Local extrema over a centred window of `2 * window + 1` bars.
///
/// Uses bars on both sides of each candidate, so it is a chart annotation
/// and must never feed the forecast features.
pub fn support_resistance(series: &PriceSeries, window: usize) -> SupportResistance {
    let highs = series.highs();
    let lows = series.lows();
    let n = highs.len();
    if window == 0 || n <= 2 * window {
        return SupportResistance::default();
    }

    let mut resistance = Vec::new();
    let mut support = Vec::new();

    for i in window..n - window {
        let span = i - window..=i + window;
        let max_high = highs[span.clone()]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let min_low = lows[span].iter().copied().fold(f64::INFINITY, f64::min);

        if highs[i] == max_high {
            resistance.push(highs[i]);
        }
        if lows[i] == min_low {
            support.push(lows[i]);
        }
    }

    resistance.sort_by(|a, b| b.total_cmp(a));
    resistance.dedup();
    resistance.truncate(5);

    support.sort_by(|a, b| a.total_cmp(b));
    support.dedup();
    let skip = support.len().saturating_sub(5);
    let support = support.split_off(skip);

    SupportResistance {
        resistance,
        support,
    }
}

pub const FIBONACCI_RATIOS: [(&str, f64); 6] = [
    ("0%", 0.0),
    ("23.6%", 0.236),
    ("38.2%", 0.382),
    ("50%", 0.5),
    ("61.8%", 0.618),
    ("100%", 1.0),
];

/// Retracement levels measured down from `high`
pub fn fibonacci_retracement(high: f64, low: f64) -> Vec<(&'static str, f64)> {
    let diff = high - low;
    FIBONACCI_RATIOS
        .iter()
        .map(|(label, ratio)| (*label, high - ratio * diff))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_data::technical_analysis::IndicatorProfile;
    use crate::domain::market::price_series::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    PriceBar::new(start + Duration::days(i as i64), c, c + 0.5, c - 0.5, c, 500.0)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_rsi_overbought_on_rally() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let s = series(&closes);
        let table = IndicatorTable::analyze(&s, IndicatorProfile::Forecast);
        let signals = SignalGenerator::new().generate(&table, &closes);

        let rsi = signals.iter().find(|s| s.indicator == "rsi").unwrap();
        assert_eq!(rsi.signal, Signal::Sell);
        assert_eq!(rsi.reason, "Overbought");
    }

    #[test]
    fn test_short_history_skips_slow_indicators() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let s = series(&closes);
        let table = IndicatorTable::analyze(&s, IndicatorProfile::Forecast);
        let signals = SignalGenerator::new().generate(&table, &closes);

        assert!(signals.iter().all(|s| s.indicator != "rsi"));
        assert!(signals.iter().all(|s| s.indicator != "moving_average"));
        // MACD is defined from the first bar
        assert!(signals.iter().any(|s| s.indicator == "macd"));
    }

    #[test]
    fn test_crossover_detection() {
        let fast = vec![Some(1.0), Some(3.0)];
        let slow = vec![Some(2.0), Some(2.0)];
        let s = crossover("x", &fast, &slow, "up", "down").unwrap();
        assert_eq!(s.signal, Signal::Buy);

        let s = crossover("x", &slow, &fast, "up", "down").unwrap();
        assert_eq!(s.signal, Signal::Sell);

        let missing = vec![None, Some(3.0)];
        assert!(crossover("x", &missing, &slow, "up", "down").is_none());
    }

    #[test]
    fn test_support_resistance_levels() {
        let closes: Vec<f64> = (0..100)
            .map(|i| 100.0 + (i as f64 * std::f64::consts::PI / 10.0).sin() * 10.0)
            .collect();
        let levels = support_resistance(&series(&closes), 5);

        assert!(!levels.resistance.is_empty());
        assert!(!levels.support.is_empty());
        assert!(levels.resistance.len() <= 5 && levels.support.len() <= 5);
        assert!(levels.resistance.windows(2).all(|w| w[0] > w[1]));
        assert!(levels.support.windows(2).all(|w| w[0] < w[1]));
        assert!(levels.resistance[0] > levels.support[0]);
    }

    #[test]
    fn test_support_resistance_short_series() {
        let levels = support_resistance(&series(&[1.0, 2.0, 3.0]), 5);
        assert_eq!(levels, SupportResistance::default());
    }

    #[test]
    fn test_fibonacci_levels() {
        let levels = fibonacci_retracement(200.0, 100.0);
        assert_eq!(levels.len(), 6);
        assert_eq!(levels[0], ("0%", 200.0));
        assert!((levels[3].1 - 150.0).abs() < 1e-9);
        assert!((levels[4].1 - 138.2).abs() < 1e-9);
        assert_eq!(levels[5], ("100%", 100.0));
    }
}
