use crate::domain::config::forecast_config::{
    ForecastConfig, GradientBoostingSettings, RandomForestSettings,
};
use crate::domain::errors::ForecastError;
use crate::domain::ml::forecast::ModelType;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

/// Interface for the regression models behind the forecast engine.
///
/// A regressor is fit once per forecast run and dropped afterwards.
pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ForecastError>;

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError>;

    /// Predict a single row
    fn predict_one(&self, row: &[f64]) -> Result<f64, ForecastError> {
        self.predict(&[row.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| ForecastError::training(self.name(), "No prediction returned"))
    }

    fn name(&self) -> &str;
}

fn to_matrix(x: &[Vec<f64>], model: &str) -> Result<DenseMatrix<f64>, ForecastError> {
    if x.is_empty() {
        return Err(ForecastError::training(model, "Empty feature matrix"));
    }
    DenseMatrix::from_2d_vec(&x.to_vec())
        .map_err(|e| ForecastError::training(model, format!("Matrix creation failed: {}", e)))
}

fn not_fitted(model: &str) -> ForecastError {
    ForecastError::training(model, "Model not trained")
}

/// Ordinary least squares on whatever columns it is given. The engine feeds
/// it the integer time index only, making it a trend baseline.
///
/// With no more rows than columns the slope is undetermined; the fit is then
/// the flat mean of the targets.
#[derive(Default)]
pub struct LinearTrendModel {
    model: Option<LinearFit>,
}

enum LinearFit {
    Mean(f64),
    Ols(LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>),
}

impl LinearTrendModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for LinearTrendModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ForecastError> {
        let matrix = to_matrix(x, self.name())?;
        if y.len() != x.len() {
            return Err(ForecastError::training(
                self.name(),
                format!("Shape mismatch: {} rows, {} targets", x.len(), y.len()),
            ));
        }

        let columns = x.first().map_or(0, Vec::len);
        if x.len() <= columns {
            let mean = y.iter().sum::<f64>() / y.len() as f64;
            debug!(
                "Linear fit on {} rows x {} columns is underdetermined, using flat mean {:.4}",
                x.len(),
                columns,
                mean
            );
            self.model = Some(LinearFit::Mean(mean));
            return Ok(());
        }

        let model = LinearRegression::fit(&matrix, &y.to_vec(), LinearRegressionParameters::default())
            .map_err(|e| ForecastError::training(self.name(), e))?;
        self.model = Some(LinearFit::Ols(model));
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let matrix = to_matrix(x, self.name())?;
        match model {
            LinearFit::Mean(mean) => Ok(vec![*mean; x.len()]),
            LinearFit::Ols(ols) => ols
                .predict(&matrix)
                .map_err(|e| ForecastError::training(self.name(), e)),
        }
    }

    fn name(&self) -> &str {
        "Linear Regression"
    }
}

pub struct RandomForestModel {
    settings: RandomForestSettings,
    model: Option<RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
}

impl RandomForestModel {
    pub fn new(settings: RandomForestSettings) -> Self {
        Self {
            settings,
            model: None,
        }
    }
}

impl Regressor for RandomForestModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ForecastError> {
        let matrix = to_matrix(x, self.name())?;
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.settings.n_trees)
            .with_max_depth(self.settings.max_depth)
            .with_min_samples_split(self.settings.min_samples_split);

        debug!(
            "Training Random Forest Regressor (Trees: {}, Depth: {}, MinSplit: {}) on {} rows",
            self.settings.n_trees,
            self.settings.max_depth,
            self.settings.min_samples_split,
            x.len()
        );

        let model = RandomForestRegressor::fit(&matrix, &y.to_vec(), params)
            .map_err(|e| ForecastError::training(self.name(), e))?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let matrix = to_matrix(x, self.name())?;
        model
            .predict(&matrix)
            .map_err(|e| ForecastError::training(self.name(), e))
    }

    fn name(&self) -> &str {
        "Random Forest"
    }
}

/// Least-squares gradient boosting over shallow regression trees.
///
/// Starts from the mean target; every stage fits a tree to the current
/// residuals and adds it scaled by the learning rate.
pub struct GradientBoostingModel {
    settings: GradientBoostingSettings,
    init: f64,
    stages: Vec<DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
    fitted: bool,
}

impl GradientBoostingModel {
    pub fn new(settings: GradientBoostingSettings) -> Self {
        Self {
            settings,
            init: 0.0,
            stages: Vec::new(),
            fitted: false,
        }
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

impl Regressor for GradientBoostingModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ForecastError> {
        if y.is_empty() || y.len() != x.len() {
            return Err(ForecastError::training(
                self.name(),
                format!("Shape mismatch: {} rows, {} targets", x.len(), y.len()),
            ));
        }

        let matrix = to_matrix(x, self.name())?;
        let lr = self.settings.learning_rate;

        self.init = y.iter().sum::<f64>() / y.len() as f64;
        self.stages.clear();
        let mut current = vec![self.init; y.len()];

        for _ in 0..self.settings.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
            if residuals.iter().all(|r| r.abs() < 1e-12) {
                break;
            }

            let params = DecisionTreeRegressorParameters::default()
                .with_max_depth(self.settings.max_depth)
                .with_min_samples_split(self.settings.min_samples_split);
            let tree = DecisionTreeRegressor::fit(&matrix, &residuals, params)
                .map_err(|e| ForecastError::training(self.name(), e))?;
            let update = tree
                .predict(&matrix)
                .map_err(|e| ForecastError::training(self.name(), e))?;

            for (p, u) in current.iter_mut().zip(update) {
                *p += lr * u;
            }
            self.stages.push(tree);
        }

        debug!(
            "Gradient boosting fit: {} stages (lr={}, depth={}) on {} rows",
            self.stages.len(),
            lr,
            self.settings.max_depth,
            x.len()
        );
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        if !self.fitted {
            return Err(not_fitted(self.name()));
        }
        let matrix = to_matrix(x, self.name())?;
        let mut out = vec![self.init; x.len()];

        for tree in &self.stages {
            let update = tree
                .predict(&matrix)
                .map_err(|e| ForecastError::training(self.name(), e))?;
            for (p, u) in out.iter_mut().zip(update) {
                *p += self.settings.learning_rate * u;
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "Gradient Boosting Regressor"
    }
}

pub struct RegressorFactory;

impl RegressorFactory {
    pub fn create(config: &ForecastConfig) -> Result<Box<dyn Regressor>, ForecastError> {
        match &config.model_type {
            ModelType::Linear => Ok(Box::new(LinearTrendModel::new())),
            ModelType::RandomForest => Ok(Box::new(RandomForestModel::new(config.random_forest))),
            ModelType::GradientBoosting => Ok(Box::new(GradientBoostingModel::new(
                config.gradient_boosting,
            ))),
            ModelType::Unrecognized(name) => Err(ForecastError::UnsupportedModel(name.clone())),
        }
    }
}
