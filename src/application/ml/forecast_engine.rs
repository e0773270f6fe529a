//! Train-then-forecast pipeline.
//!
//! Every call fits a fresh model on the supplied history, scores it on a
//! chronological hold-out and rolls a one-step model forward `horizon_days`
//! times. Nothing is cached between calls.

use crate::application::ml::calendar::ForecastCalendar;
use crate::application::ml::feature_builder::FeatureBuilder;
use crate::application::ml::metrics::RegressionMetrics;
use crate::application::ml::regressor::{Regressor, RegressorFactory};
use crate::domain::config::forecast_config::ForecastConfig;
use crate::domain::errors::ForecastError;
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ml::feature_registry::{CLOSE_LAG_FEATURES, FeatureSchema, PREV_CLOSE};
use crate::domain::ml::forecast::{
    DatedForecast, ForecastPoint, ForecastReport, ForecastResult, ModelType,
};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

pub struct ForecastEngine {
    config: ForecastConfig,
    features: FeatureBuilder,
    calendar: ForecastCalendar,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Self {
        if let ModelType::Unrecognized(name) = &config.model_type {
            warn!(
                "Model type '{}' is not explicitly supported. Forecasts will fail.",
                name
            );
        }

        Self {
            config,
            features: FeatureBuilder::new(),
            calendar: ForecastCalendar::default(),
        }
    }

    pub fn with_calendar(mut self, calendar: ForecastCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Tamed entry point: every failure, including a panic inside the ML
    /// library, is logged and reported as `None`.
    pub fn train_and_predict(&self, series: &PriceSeries) -> Option<ForecastResult> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_train_and_predict(series)))
            .unwrap_or_else(|payload| {
                Err(ForecastError::training(
                    self.config.model_type.to_string(),
                    panic_message(payload.as_ref()),
                ))
            });

        match outcome {
            Ok(result) => Some(result),
            Err(e) if e.is_insufficient_data() => {
                warn!("Forecast skipped: {}", e);
                None
            }
            Err(e) => {
                error!("Forecast failed: {}", e);
                None
            }
        }
    }

    pub fn try_train_and_predict(
        &self,
        series: &PriceSeries,
    ) -> Result<ForecastResult, ForecastError> {
        let horizon = self.config.horizon_days;
        info!(
            "Training {} on {} bars, horizon {} days",
            self.config.model_type,
            series.len(),
            horizon
        );

        let mut model = RegressorFactory::create(&self.config)?;

        let result = if self.config.model_type.uses_features() {
            self.run_ensemble(model.as_mut(), series, horizon)?
        } else {
            self.run_linear(model.as_mut(), series, horizon)?
        };

        info!(
            "{} trained on {} rows, held-out {} rows: MAE={:.4}, RMSE={:.4}",
            model.name(),
            result.train_len,
            result.test_len,
            result.mae,
            result.rmse
        );
        Ok(result)
    }

    fn run_linear(
        &self,
        model: &mut dyn Regressor,
        series: &PriceSeries,
        horizon: usize,
    ) -> Result<ForecastResult, ForecastError> {
        let n = series.len();
        if n < 2 {
            return Err(ForecastError::InsufficientData {
                stage: "linear trend",
                rows: n,
            });
        }

        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let y = series.closes();
        // two bars leave one training row, which the model fits as a flat mean
        let (train_len, test_len) = chronological_split(n, self.config.test_fraction)?;

        model.fit(&x[..train_len], &y[..train_len])?;
        let metrics = evaluate(model, &x[train_len..], &y[train_len..])?;

        let future: Vec<Vec<f64>> = (n..n + horizon).map(|i| vec![i as f64]).collect();
        let predictions = model.predict(&future)?;
        ensure_finite(model.name(), &predictions)?;

        Ok(ForecastResult {
            predictions,
            mae: metrics.mae,
            rmse: metrics.rmse,
            train_len,
            test_len,
        })
    }

    fn run_ensemble(
        &self,
        model: &mut dyn Regressor,
        series: &PriceSeries,
        horizon: usize,
    ) -> Result<ForecastResult, ForecastError> {
        let matrix = self.features.build(series)?;
        let (train_len, test_len) = chronological_split(matrix.len(), self.config.test_fraction)?;

        model.fit(&matrix.rows[..train_len], &matrix.targets[..train_len])?;
        let metrics = evaluate(model, &matrix.rows[train_len..], &matrix.targets[train_len..])?;

        let seed = match &matrix.forecast_seed {
            Some(seed) => seed.clone(),
            None => {
                debug!("No complete row for the final bar, seeding from last training row");
                matrix
                    .rows
                    .last()
                    .cloned()
                    .ok_or(ForecastError::InsufficientData {
                        stage: "forecast seed",
                        rows: 0,
                    })?
            }
        };

        debug!("Forecast seed: {:?}", matrix.schema.label(&seed));
        let predictions = recursive_forecast(model, &matrix.schema, seed, horizon)?;

        Ok(ForecastResult {
            predictions,
            mae: metrics.mae,
            rmse: metrics.rmse,
            train_len,
            test_len,
        })
    }

    /// Forecast paired with the dates following the last bar
    pub fn forecast_with_dates(&self, series: &PriceSeries) -> Option<DatedForecast> {
        let last_observed = series.last()?.date;
        let result = self.train_and_predict(series)?;
        Some(self.attach_dates(last_observed, &result))
    }

    fn attach_dates(
        &self,
        last_observed: chrono::NaiveDate,
        result: &ForecastResult,
    ) -> DatedForecast {
        let dates = self
            .calendar
            .dates_after(last_observed, result.predictions.len());
        let points = dates
            .into_iter()
            .zip(&result.predictions)
            .map(|(date, &close)| ForecastPoint { date, close })
            .collect();

        DatedForecast {
            last_observed,
            points,
            mae: result.mae,
            rmse: result.rmse,
        }
    }

    /// Run summary for the caller's analysis history
    pub fn report(&self, series: &PriceSeries) -> Option<ForecastReport> {
        let last = series.last()?;
        let result = self.train_and_predict(series)?;
        let dated = self.attach_dates(last.date, &result);
        Some(ForecastReport::new(
            &self.config.model_type,
            series.len(),
            last.close,
            &result,
            &dated,
        ))
    }
}

/// `(train_len, test_len)` for an unshuffled split; the test suffix gets
/// `ceil(n * test_fraction)` rows.
pub fn chronological_split(n: usize, test_fraction: f64) -> Result<(usize, usize), ForecastError> {
    let test_len = ((n as f64) * test_fraction).ceil() as usize;
    let train_len = n.saturating_sub(test_len);

    if train_len == 0 || test_len == 0 {
        return Err(ForecastError::InsufficientData {
            stage: "train/test split",
            rows: n,
        });
    }
    Ok((train_len, test_len))
}

fn evaluate(
    model: &dyn Regressor,
    x: &[Vec<f64>],
    y: &[f64],
) -> Result<RegressionMetrics, ForecastError> {
    let predicted = model.predict(x)?;
    RegressionMetrics::evaluate(y, &predicted)
        .ok_or_else(|| ForecastError::training(model.name(), "Non-finite held-out error"))
}

/// Roll `model` forward one step at a time from `seed`.
///
/// After each step the prediction becomes `close_lag_1` and `prev_close`,
/// the older lags shift back by one, and every other column keeps its
/// last observed value.
pub(crate) fn recursive_forecast(
    model: &dyn Regressor,
    schema: &FeatureSchema,
    seed: Vec<f64>,
    horizon: usize,
) -> Result<Vec<f64>, ForecastError> {
    let column = |name: &str| {
        schema
            .index_of(name)
            .ok_or_else(|| ForecastError::training(model.name(), format!("Missing feature {}", name)))
    };
    let lags = [
        column(CLOSE_LAG_FEATURES[0])?,
        column(CLOSE_LAG_FEATURES[1])?,
        column(CLOSE_LAG_FEATURES[2])?,
    ];
    let prev_close = column(PREV_CLOSE)?;

    if seed.len() != schema.len() {
        return Err(ForecastError::training(
            model.name(),
            format!("Seed has {} values, schema {}", seed.len(), schema.len()),
        ));
    }

    let mut row = seed;
    let mut predictions = Vec::new();

    for step in 0..horizon {
        let next = model.predict_one(&row)?;
        if !next.is_finite() {
            return Err(ForecastError::training(
                model.name(),
                format!("Non-finite prediction at step {}", step + 1),
            ));
        }
        predictions.push(next);

        row[lags[2]] = row[lags[1]];
        row[lags[1]] = row[lags[0]];
        row[lags[0]] = next;
        row[prev_close] = next;
    }

    Ok(predictions)
}

fn ensure_finite(model: &str, values: &[f64]) -> Result<(), ForecastError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ForecastError::training(model, "Non-finite forecast"))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic in model library".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::price_series::PriceBar;
    use chrono::{Duration, NaiveDate};

    /// Predicts `close_lag_1 + 1`, recording nothing else
    struct StepModel {
        lag1: usize,
    }

    impl Regressor for StepModel {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<(), ForecastError> {
            Ok(())
        }

        fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
            Ok(x.iter().map(|row| row[self.lag1] + 1.0).collect())
        }

        fn name(&self) -> &str {
            "step"
        }
    }

    /// Returns the sum of the three lags so the shift order shows up in output
    struct LagSumModel {
        lags: [usize; 3],
    }

    impl Regressor for LagSumModel {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<(), ForecastError> {
            Ok(())
        }

        fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
            Ok(x.iter()
                .map(|row| self.lags.iter().map(|&i| row[i]).sum())
                .collect())
        }

        fn name(&self) -> &str {
            "lag-sum"
        }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            ["rsi", PREV_CLOSE, "close_lag_1", "close_lag_2", "close_lag_3"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    PriceBar::new(start + Duration::days(i as i64), c, c + 1.0, c - 1.0, c, 1e6)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_split_sizes() {
        assert_eq!(chronological_split(100, 0.2).unwrap(), (80, 20));
        assert_eq!(chronological_split(31, 0.2).unwrap(), (24, 7));
        assert_eq!(chronological_split(2, 0.2).unwrap(), (1, 1));
        assert!(chronological_split(1, 0.2).unwrap_err().is_insufficient_data());
        assert!(chronological_split(0, 0.2).is_err());
    }

    #[test]
    fn test_recursive_feedback_increments() {
        let model = StepModel { lag1: 2 };
        let seed = vec![55.0, 9.0, 10.0, 8.0, 7.0];
        let preds = recursive_forecast(&model, &schema(), seed, 4).unwrap();
        assert_eq!(preds, vec![11.0, 12.0, 13.0, 14.0]);
    }

    #[test]
    fn test_lags_shift_in_order() {
        let model = LagSumModel { lags: [2, 3, 4] };
        // lags 3, 2, 1
        let seed = vec![0.0, 0.0, 3.0, 2.0, 1.0];
        let preds = recursive_forecast(&model, &schema(), seed, 3).unwrap();
        // 3+2+1=6; then (6,3,2)=11; then (11,6,3)=20
        assert_eq!(preds, vec![6.0, 11.0, 20.0]);
    }

    #[test]
    fn test_recursive_rejects_mismatched_seed() {
        let model = StepModel { lag1: 2 };
        let result = recursive_forecast(&model, &schema(), vec![1.0, 2.0], 3);
        assert!(matches!(result, Err(ForecastError::Training { .. })));
    }

    #[test]
    fn test_linear_continues_trend() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let engine = ForecastEngine::new(ForecastConfig::new(ModelType::Linear, 5).unwrap());
        let result = engine.train_and_predict(&series(&closes)).unwrap();

        assert_eq!(result.predictions.len(), 5);
        for (k, p) in result.predictions.iter().enumerate() {
            assert!((p - (200.0 + k as f64)).abs() < 1e-6, "step {}: {}", k, p);
        }
        assert!(result.mae < 1e-6);
        assert_eq!((result.train_len, result.test_len), (80, 20));
    }

    #[test]
    fn test_linear_single_bar_fails() {
        let engine = ForecastEngine::new(ForecastConfig::new(ModelType::Linear, 5).unwrap());
        let err = engine.try_train_and_predict(&series(&[100.0])).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_linear_two_bars_is_flat() {
        let engine = ForecastEngine::new(ForecastConfig::new(ModelType::Linear, 3).unwrap());
        let s = series(&[100.0, 101.0]);

        let result = engine.try_train_and_predict(&s).unwrap();
        assert_eq!(result.predictions, vec![100.0, 100.0, 100.0]);
        assert_eq!((result.train_len, result.test_len), (1, 1));
        assert!((result.mae - 1.0).abs() < 1e-12);
        assert_eq!(engine.train_and_predict(&s), Some(result));
    }

    #[test]
    fn test_unrecognized_model_fails_softly() {
        let config = ForecastConfig::new(ModelType::parse("prophet"), 5).unwrap();
        let engine = ForecastEngine::new(config);
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();

        assert!(matches!(
            engine.try_train_and_predict(&series(&closes)),
            Err(ForecastError::UnsupportedModel(_))
        ));
        assert!(engine.train_and_predict(&series(&closes)).is_none());
    }

    #[test]
    fn test_dates_follow_last_bar() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + 0.5 * i as f64).collect();
        let s = series(&closes);
        let engine = ForecastEngine::new(ForecastConfig::new(ModelType::Linear, 7).unwrap())
            .with_calendar(ForecastCalendar::Daily);

        let dated = engine.forecast_with_dates(&s).unwrap();
        let last = s.last().unwrap().date;
        assert_eq!(dated.last_observed, last);
        assert_eq!(dated.points.len(), 7);
        assert_eq!(dated.points[0].date, last + Duration::days(1));
        assert!(dated.points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_report_summary() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let engine = ForecastEngine::new(ForecastConfig::new(ModelType::Linear, 10).unwrap());
        let report = engine.report(&series(&closes)).unwrap();

        assert_eq!(report.model, "linear");
        assert_eq!(report.horizon_days, 10);
        assert_eq!(report.history_len, 60);
        assert_eq!(report.last_observed_close, 69.0);
        assert!(report.expected_change_pct().unwrap() > 0.0);
    }
}
