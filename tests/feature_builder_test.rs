use chrono::{Duration, NaiveDate};
use stock_forecast::application::ml::FeatureBuilder;
use stock_forecast::domain::errors::ForecastError;
use stock_forecast::domain::market::price_series::{PriceBar, PriceSeries};

fn create_series(n: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
    let bars = (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 150.0 + (t * 0.21).sin() * 6.0 + (t * 0.05).cos() * 3.0 + t * 0.08;
            let open = close - (t * 0.7).sin();
            PriceBar::new(
                start + Duration::days(i as i64),
                open,
                close.max(open) + 0.8 + (t * 0.3).cos().abs(),
                close.min(open) - 0.9,
                close,
                1_000_000.0 + (t * 0.9).sin() * 150_000.0,
            )
        })
        .collect();
    PriceSeries::new(bars).unwrap()
}

fn truncate(series: &PriceSeries, len: usize) -> PriceSeries {
    PriceSeries::new(series.bars()[..len].to_vec()).unwrap()
}

#[test]
fn test_targets_are_next_close() {
    let series = create_series(150);
    let closes = series.closes();
    let matrix = FeatureBuilder::new().build(&series).unwrap();

    for (target, &pos) in matrix.targets.iter().zip(&matrix.positions) {
        assert_eq!(*target, closes[pos + 1]);
    }
}

#[test]
fn test_features_ignore_future_bars() {
    let full = create_series(150);
    let prefix = truncate(&full, 100);

    let full_matrix = FeatureBuilder::new().build(&full).unwrap();
    let prefix_matrix = FeatureBuilder::new().build(&prefix).unwrap();

    assert_eq!(full_matrix.schema, prefix_matrix.schema);
    for (row, &pos) in prefix_matrix.rows.iter().zip(&prefix_matrix.positions) {
        let idx = full_matrix.positions.iter().position(|&p| p == pos).unwrap();
        for (a, b) in row.iter().zip(&full_matrix.rows[idx]) {
            assert!((a - b).abs() < 1e-9, "feature at bar {} changed: {} vs {}", pos, a, b);
        }
    }

    // the prefix's final bar becomes the forecast seed, a full row in the longer build
    let seed = prefix_matrix.forecast_seed.unwrap();
    let idx = full_matrix.positions.iter().position(|&p| p == 99).unwrap();
    for (a, b) in seed.iter().zip(&full_matrix.rows[idx]) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_rows_align_with_input() {
    let series = create_series(120);
    let dates = series.dates();
    let matrix = FeatureBuilder::new().build(&series).unwrap();

    assert_eq!(matrix.rows.len(), matrix.targets.len());
    assert_eq!(matrix.rows.len(), matrix.dates.len());
    assert!(matrix.positions.windows(2).all(|w| w[0] < w[1]));
    assert!(*matrix.positions.last().unwrap() < series.len() - 1);
    for (date, &pos) in matrix.dates.iter().zip(&matrix.positions) {
        assert_eq!(*date, dates[pos]);
    }
    assert!(matrix.rows.iter().flatten().all(|v| v.is_finite()));
}

#[test]
fn test_feature_order_is_deterministic() {
    let series = create_series(90);
    let first = FeatureBuilder::new().build(&series).unwrap();
    let second = FeatureBuilder::new().build(&series).unwrap();

    assert_eq!(first.schema, second.schema);
    assert_eq!(first.rows, second.rows);
    assert_eq!(
        &first.schema.names()[first.schema.len() - 3..],
        &["close_lag_1", "close_lag_2", "close_lag_3"]
    );
}

#[test]
fn test_five_bars_is_insufficient() {
    let result = FeatureBuilder::new().build(&create_series(5));
    match result {
        Err(e @ ForecastError::InsufficientData { .. }) => assert!(e.is_insufficient_data()),
        other => panic!("expected insufficient data, got {:?}", other.map(|m| m.len())),
    }
}

#[test]
fn test_minimum_history() {
    // slowest indicator is the 50-bar SMA: 51 bars leave one training row
    let matrix = FeatureBuilder::new().build(&create_series(51)).unwrap();
    assert_eq!(matrix.len(), 1);
    assert!(FeatureBuilder::new().build(&create_series(50)).is_err());
}
