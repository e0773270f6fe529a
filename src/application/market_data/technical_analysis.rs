//! Technical indicators over a daily price history.
//!
//! Every indicator is computed bar by bar and returns one value per input bar.
//! `None` marks the warm-up period or a value that is undefined for the bar.
//! Bar `i` only ever reads bars `0..=i`, so the output can feed a supervised
//! dataset without look-ahead.

use crate::domain::market::price_series::{PriceBar, PriceSeries};
use statrs::statistics::Statistics;
use ta::indicators::{
    ExponentialMovingAverage, Maximum, Minimum, MovingAverageConvergenceDivergence,
    SimpleMovingAverage, TrueRange,
};
use ta::{Close, High, Low, Next};
use tracing::warn;

pub type IndicatorSeries = Vec<Option<f64>>;

impl High for PriceBar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for PriceBar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for PriceBar {
    fn close(&self) -> f64 {
        self.close
    }
}

/// Simple moving average; `None` until `period` values have been seen
pub fn sma(values: &[f64], period: usize) -> IndicatorSeries {
    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(e) => {
            warn!("Invalid SMA period {}: {:?}", period, e);
            return vec![None; values.len()];
        }
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let out = indicator.next(v);
            (i + 1 >= period).then_some(out)
        })
        .collect()
}

/// Exponential moving average (span `period`), seeded with the first value.
///
/// Recursive form `alpha * x + (1 - alpha) * prev` with `alpha = 2 / (period + 1)`,
/// so early values differ from a bias-adjusted EMA.
pub fn ema(values: &[f64], period: usize) -> IndicatorSeries {
    let mut indicator = match ExponentialMovingAverage::new(period) {
        Ok(i) => i,
        Err(e) => {
            warn!("Invalid EMA period {}: {:?}", period, e);
            return vec![None; values.len()];
        }
    };

    values.iter().map(|&v| Some(indicator.next(v))).collect()
}

/// Relative Strength Index over rolling-mean gains and losses.
///
/// `ta::indicators::RelativeStrengthIndex` smooths with an EMA instead, so the
/// simple-average form is computed here.
/// A window with no movement at all reads 50; a window without losses reads 100.
pub fn rsi(closes: &[f64], period: usize) -> IndicatorSeries {
    let n = closes.len();
    let mut out = vec![None; n];
    if period == 0 || n <= period {
        return out;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    for i in period..n {
        // deltas[i - 1] is the change into bar i
        let window = &deltas[i - period..i];
        let avg_gain = window.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
        let avg_loss = -window.iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;

        let value = if avg_loss <= f64::EPSILON {
            if avg_gain <= f64::EPSILON { 50.0 } else { 100.0 }
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        out[i] = Some(value);
    }

    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: IndicatorSeries,
    pub middle: IndicatorSeries,
    pub lower: IndicatorSeries,
}

/// Bollinger Bands: SMA ± `std_dev` sample standard deviations.
///
/// `ta::indicators::BollingerBands` uses the population deviation.
pub fn bollinger_bands(closes: &[f64], period: usize, std_dev: f64) -> BollingerSeries {
    let middle = sma(closes, period);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    for (i, mid) in middle.iter().enumerate() {
        let Some(mid) = *mid else { continue };
        if period < 2 {
            upper[i] = Some(mid);
            lower[i] = Some(mid);
            continue;
        }
        let sd = closes[i + 1 - period..=i].iter().std_dev();
        upper[i] = Some(mid + std_dev * sd);
        lower[i] = Some(mid - std_dev * sd);
    }

    BollingerSeries {
        upper,
        middle,
        lower,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

/// MACD line, signal line and histogram
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let n = closes.len();
    let mut indicator = match MovingAverageConvergenceDivergence::new(fast, slow, signal) {
        Ok(i) => i,
        Err(e) => {
            warn!("Invalid MACD periods ({}, {}, {}): {:?}", fast, slow, signal, e);
            return MacdSeries {
                macd: vec![None; n],
                signal: vec![None; n],
                histogram: vec![None; n],
            };
        }
    };

    let mut out = MacdSeries {
        macd: Vec::with_capacity(n),
        signal: Vec::with_capacity(n),
        histogram: Vec::with_capacity(n),
    };
    for &c in closes {
        let v = indicator.next(c);
        out.macd.push(Some(v.macd));
        out.signal.push(Some(v.signal));
        out.histogram.push(Some(v.histogram));
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticSeries {
    pub k: IndicatorSeries,
    pub d: IndicatorSeries,
}

/// Stochastic oscillator %K / %D. A flat window reads 50.
pub fn stochastic_oscillator(bars: &[PriceBar], k_period: usize, d_period: usize) -> StochasticSeries {
    let k: IndicatorSeries = rolling_extremes(bars, k_period)
        .into_iter()
        .zip(bars)
        .map(|(ext, bar)| {
            ext.map(|(hh, ll)| {
                let c = bar.close;
                let range = hh - ll;
                if range.abs() <= f64::EPSILON {
                    50.0
                } else {
                    100.0 * (c - ll) / range
                }
            })
        })
        .collect();
    let d = rolling_mean(&k, d_period);
    StochasticSeries { k, d }
}

/// Williams %R. A flat window reads -50.
pub fn williams_r(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    rolling_extremes(bars, period)
        .into_iter()
        .zip(bars)
        .map(|(ext, bar)| {
            ext.map(|(hh, ll)| {
                let c = bar.close;
                let range = hh - ll;
                if range.abs() <= f64::EPSILON {
                    -50.0
                } else {
                    -100.0 * (hh - c) / range
                }
            })
        })
        .collect()
}

/// True range; the first bar has no previous close and uses high - low
pub fn true_range(bars: &[PriceBar]) -> Vec<f64> {
    let mut indicator = TrueRange::new();
    bars.iter().map(|bar| indicator.next(bar)).collect()
}

/// Average True Range: rolling mean of the true range.
///
/// `ta::indicators::AverageTrueRange` smooths with an EMA instead.
pub fn average_true_range(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    sma(&true_range(bars), period)
}

/// Commodity Channel Index. Zero mean deviation reads 0.
pub fn commodity_channel_index(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let typical: Vec<f64> = bars.iter().map(PriceBar::typical_price).collect();

    (0..typical.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let window = &typical[i + 1 - period..=i];
            let mean = window.iter().mean();
            let mad = window.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;
            if mad <= f64::EPSILON {
                Some(0.0)
            } else {
                Some((typical[i] - mean) / (0.015 * mad))
            }
        })
        .collect()
}

/// Cumulative volume-weighted average price
pub fn volume_weighted_average_price(bars: &[PriceBar]) -> IndicatorSeries {
    let mut pv = 0.0;
    let mut vol = 0.0;
    bars.iter()
        .map(|bar| {
            pv += bar.typical_price() * bar.volume;
            vol += bar.volume;
            (vol.abs() > f64::EPSILON).then(|| pv / vol)
        })
        .collect()
}

/// On-Balance Volume, starting at the first bar's volume
pub fn on_balance_volume(closes: &[f64], volumes: &[f64]) -> IndicatorSeries {
    let mut out = Vec::with_capacity(closes.len());
    let mut obv = 0.0;
    for i in 0..closes.len() {
        if i == 0 {
            obv = volumes[0];
        } else if closes[i] > closes[i - 1] {
            obv += volumes[i];
        } else if closes[i] < closes[i - 1] {
            obv -= volumes[i];
        }
        out.push(Some(obv));
    }
    out
}

/// Rolling (highest high, lowest low); `None` until `period` bars have been seen
fn rolling_extremes(bars: &[PriceBar], period: usize) -> Vec<Option<(f64, f64)>> {
    let (mut highest, mut lowest) = match (Maximum::new(period), Minimum::new(period)) {
        (Ok(h), Ok(l)) => (h, l),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Invalid rolling window {}: {:?}", period, e);
            return vec![None; bars.len()];
        }
    };

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hh = highest.next(bar);
            let ll = lowest.next(bar);
            (i + 1 >= period).then_some((hh, ll))
        })
        .collect()
}

/// Rolling mean over an indicator; `None` if any value in the window is missing
fn rolling_mean(values: &[Option<f64>], period: usize) -> IndicatorSeries {
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            let sum = window.iter().try_fold(0.0, |acc, v| (*v).map(|x| acc + x))?;
            Some(sum / period as f64)
        })
        .collect()
}

/// Which indicator columns to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorProfile {
    /// Full dashboard set, including the 200-day trend average
    Dashboard,
    /// Dashboard set without `sma_200`, so ~50 bars of history suffice
    Forecast,
}

/// Ordered set of named indicator columns aligned with a price series
#[derive(Debug, Clone, Default)]
pub struct IndicatorTable {
    columns: Vec<(&'static str, IndicatorSeries)>,
    len: usize,
}

impl IndicatorTable {
    pub fn analyze(series: &PriceSeries, profile: IndicatorProfile) -> Self {
        if series.is_empty() {
            return Self::default();
        }

        let bars = series.bars();
        let closes = series.closes();
        let volumes = series.volumes();

        let mut table = Self {
            columns: Vec::with_capacity(19),
            len: series.len(),
        };

        // Moving averages
        table.push("sma_20", sma(&closes, 20));
        table.push("sma_50", sma(&closes, 50));
        if profile == IndicatorProfile::Dashboard {
            table.push("sma_200", sma(&closes, 200));
        }
        table.push("ema_12", ema(&closes, 12));
        table.push("ema_26", ema(&closes, 26));

        // Momentum
        table.push("rsi", rsi(&closes, 14));
        table.push("williams_r", williams_r(bars, 14));

        // Volatility
        let bb = bollinger_bands(&closes, 20, 2.0);
        table.push("bb_upper", bb.upper);
        table.push("bb_middle", bb.middle);
        table.push("bb_lower", bb.lower);
        table.push("atr", average_true_range(bars, 14));

        // Trend
        let m = macd(&closes, 12, 26, 9);
        table.push("macd", m.macd);
        table.push("macd_signal", m.signal);
        table.push("macd_histogram", m.histogram);

        // Oscillators
        let stoch = stochastic_oscillator(bars, 14, 3);
        table.push("stoch_k", stoch.k);
        table.push("stoch_d", stoch.d);
        table.push("cci", commodity_channel_index(bars, 20));

        // Volume
        table.push("vwap", volume_weighted_average_price(bars));
        table.push("obv", on_balance_volume(&closes, &volumes));

        table
    }

    fn push(&mut self, name: &'static str, values: IndicatorSeries) {
        debug_assert_eq!(values.len(), self.len);
        self.columns.push((name, values));
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(name, _)| *name)
    }

    pub fn columns(&self) -> &[(&'static str, IndicatorSeries)] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorSeries> {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| values)
    }

    /// Most recent defined value of a column
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.get(name)?.iter().rev().find_map(|v| *v)
    }
}
