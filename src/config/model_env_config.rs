//! Model hyperparameters from environment variables.

use super::parse_var;
use crate::domain::config::{GradientBoostingSettings, RandomForestSettings};
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    // Random forest
    pub rf_n_trees: usize,
    pub rf_max_depth: u16,
    pub rf_min_samples_split: usize,

    // Gradient boosting
    pub gb_n_estimators: usize,
    pub gb_learning_rate: f64,
    pub gb_max_depth: u16,
}

impl ModelEnvConfig {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let rf = RandomForestSettings::default();
        let gb = GradientBoostingSettings::default();

        Ok(Self {
            rf_n_trees: parse_var(lookup, "RF_N_TREES", rf.n_trees)?,
            rf_max_depth: parse_var(lookup, "RF_MAX_DEPTH", rf.max_depth)?,
            rf_min_samples_split: parse_var(lookup, "RF_MIN_SAMPLES_SPLIT", rf.min_samples_split)?,
            gb_n_estimators: parse_var(lookup, "GB_N_ESTIMATORS", gb.n_estimators)?,
            gb_learning_rate: parse_var(lookup, "GB_LEARNING_RATE", gb.learning_rate)?,
            gb_max_depth: parse_var(lookup, "GB_MAX_DEPTH", gb.max_depth)?,
        })
    }

    pub fn random_forest(&self) -> RandomForestSettings {
        RandomForestSettings {
            n_trees: self.rf_n_trees,
            max_depth: self.rf_max_depth,
            min_samples_split: self.rf_min_samples_split,
        }
    }

    pub fn gradient_boosting(&self) -> GradientBoostingSettings {
        GradientBoostingSettings {
            n_estimators: self.gb_n_estimators,
            learning_rate: self.gb_learning_rate,
            max_depth: self.gb_max_depth,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_defaults() {
        let config = ModelEnvConfig::from_lookup(&|_: &str| None).unwrap();
        assert_eq!(config.random_forest(), RandomForestSettings::default());
        assert_eq!(config.gradient_boosting(), GradientBoostingSettings::default());
    }

    #[test]
    fn test_depth_must_fit_u16() {
        let result =
            ModelEnvConfig::from_lookup(&|k: &str| (k == "RF_MAX_DEPTH").then(|| "70000".to_string()));
        assert!(result.is_err());
    }
}
