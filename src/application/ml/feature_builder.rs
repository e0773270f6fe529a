//! Supervised dataset construction for next-close regression.
//!
//! Turns a price history into one feature row per bar (technical indicators,
//! bar-derived deltas, lagged closes) with the next bar's close as target.
//! Rows with any undefined value are dropped: the indicator warm-up at the
//! start and the final bar, whose target does not exist yet.

use crate::application::market_data::technical_analysis::{
    IndicatorProfile, IndicatorSeries, IndicatorTable,
};
use crate::domain::errors::ForecastError;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ml::feature_registry::{
    CLOSE_LAG_FEATURES, DERIVED_FEATURES, FeatureMatrix, FeatureSchema,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder {
    profile: IndicatorProfile,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self {
            profile: IndicatorProfile::Forecast,
        }
    }

    pub fn build(&self, series: &PriceSeries) -> Result<FeatureMatrix, ForecastError> {
        info!("Building features from {} bars", series.len());

        let columns = self.feature_columns(series);
        let closes = series.closes();
        let dates = series.dates();
        let n = series.len();

        let schema = FeatureSchema::new(columns.iter().map(|(name, _)| name.clone()).collect());

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        let mut positions = Vec::new();
        let mut row_dates = Vec::new();
        let mut forecast_seed = None;

        for i in 0..n {
            let Some(row) = columns
                .iter()
                .map(|(_, values)| values[i])
                .collect::<Option<Vec<f64>>>()
            else {
                continue;
            };

            match closes.get(i + 1) {
                Some(&target) => {
                    rows.push(row);
                    targets.push(target);
                    positions.push(i);
                    row_dates.push(dates[i]);
                }
                None => forecast_seed = Some(row),
            }
        }

        if rows.is_empty() {
            warn!(
                "No complete feature rows after warm-up removal ({} bars supplied)",
                n
            );
            return Err(ForecastError::InsufficientData {
                stage: "feature engineering",
                rows: 0,
            });
        }

        debug!(
            "Feature matrix: {} rows x {} columns (dropped {} incomplete bars)",
            rows.len(),
            schema.len(),
            n - rows.len()
        );

        Ok(FeatureMatrix {
            schema,
            rows,
            targets,
            positions,
            dates: row_dates,
            forecast_seed,
        })
    }

    /// All feature columns, in canonical order: indicators, derived, lags
    fn feature_columns(&self, series: &PriceSeries) -> Vec<(String, IndicatorSeries)> {
        let table = IndicatorTable::analyze(series, self.profile);
        let opens = series.opens();
        let highs = series.highs();
        let lows = series.lows();
        let closes = series.closes();
        let volumes = series.volumes();

        let mut columns: Vec<(String, IndicatorSeries)> = table
            .columns()
            .iter()
            .map(|(name, values)| (name.to_string(), values.clone()))
            .collect();

        let derived: [IndicatorSeries; 5] = [
            shift(&closes, 1),
            diff(&closes),
            diff(&volumes),
            opens.iter().zip(&closes).map(|(o, c)| Some(o - c)).collect(),
            highs.iter().zip(&lows).map(|(h, l)| Some(h - l)).collect(),
        ];
        for (name, values) in DERIVED_FEATURES.iter().zip(derived) {
            columns.push((name.to_string(), values));
        }

        for (k, name) in CLOSE_LAG_FEATURES.iter().enumerate() {
            columns.push((name.to_string(), shift(&closes, k + 1)));
        }

        columns
    }
}

/// `out[i] = values[i - periods]`
fn shift(values: &[f64], periods: usize) -> IndicatorSeries {
    (0..values.len())
        .map(|i| i.checked_sub(periods).map(|j| values[j]))
        .collect()
}

/// `out[i] = values[i] - values[i - 1]`
fn diff(values: &[f64]) -> IndicatorSeries {
    (0..values.len())
        .map(|i| i.checked_sub(1).map(|j| values[i] - values[j]))
        .collect()
}
