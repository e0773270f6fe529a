//! Forecast Configuration Domain Value Object
//!
//! Encapsulates model selection, horizon and per-model hyperparameters for
//! one forecast run.

use crate::domain::errors::ForecastConfigError;
use crate::domain::ml::forecast::ModelType;

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomForestSettings {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
}

impl Default for RandomForestSettings {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
        }
    }
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientBoostingSettings {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_split: usize,
}

impl Default for GradientBoostingSettings {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
        }
    }
}

/// Longest forecast horizon accepted, about ten years of daily steps
pub const MAX_HORIZON_DAYS: usize = 3650;

/// Forecast configuration value object
///
/// # Invariants
///
/// - `horizon_days` in 1..=`MAX_HORIZON_DAYS`
/// - `test_fraction` in (0, 1)
/// - ensemble sizes >= 1, learning rate in (0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    pub model_type: ModelType,
    pub horizon_days: usize,
    pub test_fraction: f64,
    pub random_forest: RandomForestSettings,
    pub gradient_boosting: GradientBoostingSettings,
}

impl ForecastConfig {
    /// Create a config with default hyperparameters
    pub fn new(model_type: ModelType, horizon_days: usize) -> Result<Self, ForecastConfigError> {
        let config = Self {
            model_type,
            horizon_days,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_test_fraction(mut self, test_fraction: f64) -> Result<Self, ForecastConfigError> {
        self.test_fraction = test_fraction;
        self.validate()?;
        Ok(self)
    }

    pub fn with_random_forest(
        mut self,
        settings: RandomForestSettings,
    ) -> Result<Self, ForecastConfigError> {
        self.random_forest = settings;
        self.validate()?;
        Ok(self)
    }

    pub fn with_gradient_boosting(
        mut self,
        settings: GradientBoostingSettings,
    ) -> Result<Self, ForecastConfigError> {
        self.gradient_boosting = settings;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ForecastConfigError> {
        if self.horizon_days == 0 || self.horizon_days > MAX_HORIZON_DAYS {
            return Err(ForecastConfigError::InvalidHorizon(self.horizon_days));
        }

        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ForecastConfigError::InvalidTestFraction(self.test_fraction));
        }

        Self::validate_size("n_trees", self.random_forest.n_trees)?;
        Self::validate_size("n_estimators", self.gradient_boosting.n_estimators)?;

        let lr = self.gradient_boosting.learning_rate;
        if !(lr > 0.0 && lr <= 1.0) {
            return Err(ForecastConfigError::InvalidLearningRate(lr));
        }

        Ok(())
    }

    fn validate_size(field: &'static str, value: usize) -> Result<(), ForecastConfigError> {
        if value == 0 {
            return Err(ForecastConfigError::InvalidEnsembleSize { field, value });
        }
        Ok(())
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::RandomForest,
            horizon_days: 30,
            test_fraction: 0.2,
            random_forest: RandomForestSettings::default(),
            gradient_boosting: GradientBoostingSettings::default(),
        }
    }
}
