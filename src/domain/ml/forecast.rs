//! Forecast value objects: model selection, results and the run summary
//! handed back to the surrounding application.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Regression model family used by the forecast engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// Trend-only baseline on the integer time index
    Linear,
    RandomForest,
    GradientBoosting,
    /// Accepted for ad hoc callers, never trained
    Unrecognized(String),
}

impl ModelType {
    /// Lenient parse. Accepts snake_case keys as well as display labels
    /// ("Random Forest", "Gradient Boosting Regressor", ...).
    pub fn parse(s: &str) -> Self {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        match key.as_str() {
            "linear" | "linear_regression" | "lr" => ModelType::Linear,
            "random_forest" | "rf" => ModelType::RandomForest,
            "gradient_boosting" | "gradient_boosting_regressor" | "gbr" | "gbm" => {
                ModelType::GradientBoosting
            }
            _ => ModelType::Unrecognized(s.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ModelType::Unrecognized(_))
    }

    /// Tree ensembles consume the engineered feature matrix
    pub fn uses_features(&self) -> bool {
        matches!(self, ModelType::RandomForest | ModelType::GradientBoosting)
    }

    pub fn key(&self) -> &str {
        match self {
            ModelType::Linear => "linear",
            ModelType::RandomForest => "random_forest",
            ModelType::GradientBoosting => "gradient_boosting",
            ModelType::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Linear => write!(f, "Linear Regression"),
            ModelType::RandomForest => write!(f, "Random Forest"),
            ModelType::GradientBoosting => write!(f, "Gradient Boosting Regressor"),
            ModelType::Unrecognized(name) => write!(f, "{}", name),
        }
    }
}

/// Outcome of one successful train-and-predict run.
///
/// `mae` / `rmse` describe the held-out chronological split only; the
/// forecast horizon has no ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub predictions: Vec<f64>,
    pub mae: f64,
    pub rmse: f64,
    pub train_len: usize,
    pub test_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Forecast paired with calendar dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedForecast {
    pub last_observed: NaiveDate,
    pub points: Vec<ForecastPoint>,
    pub mae: f64,
    pub rmse: f64,
}

/// Analysis metadata of a run: parameters and result summary, in the shape
/// the application stores alongside a user's prediction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub model: String,
    pub horizon_days: usize,
    pub history_len: usize,
    pub train_len: usize,
    pub test_len: usize,
    pub mae: f64,
    pub rmse: f64,
    pub last_observed_close: f64,
    pub forecast: Vec<ForecastPoint>,
}

impl ForecastReport {
    pub fn new(
        model: &ModelType,
        history_len: usize,
        last_observed_close: f64,
        result: &ForecastResult,
        dated: &DatedForecast,
    ) -> Self {
        Self {
            model: model.key().to_string(),
            horizon_days: dated.points.len(),
            history_len,
            train_len: result.train_len,
            test_len: result.test_len,
            mae: result.mae,
            rmse: result.rmse,
            last_observed_close,
            forecast: dated.points.clone(),
        }
    }

    /// Change from the last observed close to the final forecast, in percent
    pub fn expected_change_pct(&self) -> Option<f64> {
        let last = self.forecast.last()?;
        if self.last_observed_close.abs() < f64::EPSILON {
            return None;
        }
        Some((last.close - self.last_observed_close) / self.last_observed_close * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys_and_labels() {
        assert_eq!(ModelType::parse("linear"), ModelType::Linear);
        assert_eq!(ModelType::parse("Linear Regression"), ModelType::Linear);
        assert_eq!(ModelType::parse("random_forest"), ModelType::RandomForest);
        assert_eq!(ModelType::parse("Random Forest"), ModelType::RandomForest);
        assert_eq!(
            ModelType::parse("Gradient Boosting Regressor"),
            ModelType::GradientBoosting
        );
        assert_eq!(ModelType::parse("gradient-boosting"), ModelType::GradientBoosting);
    }

    #[test]
    fn test_parse_unrecognized_keeps_name() {
        let model = ModelType::parse("Unsupported Model");
        assert_eq!(model, ModelType::Unrecognized("Unsupported Model".to_string()));
        assert!(!model.is_recognized());
        assert!(!model.uses_features());
        assert_eq!(model.to_string(), "Unsupported Model");
    }

    #[test]
    fn test_expected_change_pct() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let report = ForecastReport {
            model: "linear".to_string(),
            horizon_days: 1,
            history_len: 10,
            train_len: 8,
            test_len: 2,
            mae: 0.5,
            rmse: 0.6,
            last_observed_close: 100.0,
            forecast: vec![ForecastPoint { date, close: 110.0 }],
        };
        let change = report.expected_change_pct().unwrap();
        assert!((change - 10.0).abs() < 1e-9);
    }
}
