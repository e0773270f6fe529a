use chrono::NaiveDate;

/// Lagged close columns, newest first.
pub const CLOSE_LAG_FEATURES: [&str; 3] = ["close_lag_1", "close_lag_2", "close_lag_3"];

pub const PREV_CLOSE: &str = "prev_close";

/// Bar-derived columns appended after the indicator block.
/// Order here is part of the trained model's contract.
pub const DERIVED_FEATURES: &[&str] = &[
    PREV_CLOSE,
    "price_change",
    "volume_change",
    "open_close_diff",
    "high_low_diff",
];

/// Ordered feature names of an engineered dataset.
///
/// Built once per feature build; every prediction against a model fit on
/// that dataset must present values in exactly this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Pairs each value of `row` with its column name, for logging
    pub fn label<'a>(&'a self, row: &[f64]) -> Vec<(&'a str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(row.iter().copied())
            .collect()
    }
}

/// Leak-free supervised dataset produced by the feature builder.
///
/// `rows[i]` holds the features of bar `positions[i]` of the source series and
/// `targets[i]` is the close of the bar after it.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub schema: FeatureSchema,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    pub positions: Vec<usize>,
    pub dates: Vec<NaiveDate>,
    /// Complete feature row of the final bar (no target yet), if any.
    pub forecast_seed: Option<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
