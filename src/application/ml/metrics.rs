
/// Held-out regression error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
}

impl RegressionMetrics {
    /// `None` when the slices are empty, differ in length, or the error is
    /// not finite.
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Option<Self> {
        if actual.is_empty() || actual.len() != predicted.len() {
            return None;
        }

        let n = actual.len() as f64;
        let (abs_err, sq_err) = actual
            .iter()
            .zip(predicted)
            .fold((0.0, 0.0), |(abs, sq), (a, p)| {
                let e = a - p;
                (abs + e.abs(), sq + e * e)
            });

        let mae = abs_err / n;
        let rmse = (sq_err / n).sqrt();

        (mae.is_finite() && rmse.is_finite()).then_some(Self { mae, rmse })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_errors() {
        let m = RegressionMetrics::evaluate(&[1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 1.0, 4.0]).unwrap();
        assert!((m.mae - 0.75).abs() < 1e-12);
        assert!((m.rmse - (5.0f64 / 4.0).sqrt()).abs() < 1e-12);
        assert!(m.rmse >= m.mae);
    }

    #[test]
    fn test_perfect_prediction() {
        let m = RegressionMetrics::evaluate(&[5.0, 6.0], &[5.0, 6.0]).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(RegressionMetrics::evaluate(&[], &[]).is_none());
        assert!(RegressionMetrics::evaluate(&[1.0], &[1.0, 2.0]).is_none());
        assert!(RegressionMetrics::evaluate(&[1.0], &[f64::NAN]).is_none());
    }
}
