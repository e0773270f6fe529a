//! Stock Forecast - command-line price forecaster
//!
//! Loads a daily OHLCV CSV export, trains the configured model from scratch
//! and prints the dated forecast with held-out error metrics.
//!
//! # Usage
//! ```sh
//! cargo run --bin forecast -- --input data/AAPL.csv --model gradient_boosting --horizon 14
//! ```
//!
//! # Environment Variables
//! - `FORECAST_MODEL_TYPE` - linear | random_forest | gradient_boosting (default: random_forest)
//! - `FORECAST_HORIZON_DAYS` - Days to forecast (default: 30)
//! - `RUST_LOG` - Log filter (default: info)

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use stock_forecast::application::market_data::signal_generator::{
    SignalGenerator, fibonacci_retracement, support_resistance,
};
use stock_forecast::application::market_data::technical_analysis::{
    IndicatorProfile, IndicatorTable,
};
use stock_forecast::application::ml::ForecastEngine;
use stock_forecast::application::ml::calendar::ForecastCalendar;
use stock_forecast::config::Config;
use stock_forecast::domain::market::price_series::PriceSeries;
use stock_forecast::infrastructure::CsvPriceSource;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Daily OHLCV CSV file
    #[arg(long)]
    input: PathBuf,

    /// Model type, overrides FORECAST_MODEL_TYPE
    #[arg(long)]
    model: Option<String>,

    /// Forecast horizon in days, overrides FORECAST_HORIZON_DAYS
    #[arg(long)]
    horizon: Option<usize>,

    /// Count every calendar day instead of business days only
    #[arg(long)]
    calendar_days: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Also print dashboard signals, support/resistance and Fibonacci levels
    #[arg(long)]
    signals: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so --json output stays clean
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(model) = &args.model {
        config.forecast.model_type = model.clone();
    }
    if let Some(horizon) = args.horizon {
        config.forecast.horizon_days = horizon;
    }
    let forecast_config = config.to_forecast_config()?;
    info!(
        "Configuration loaded: Model={}, Horizon={} days",
        forecast_config.model_type, forecast_config.horizon_days
    );

    let series = CsvPriceSource::load(&args.input)?;
    if args.signals && !args.json {
        print_dashboard(&series);
    }

    let calendar = if args.calendar_days {
        ForecastCalendar::Daily
    } else {
        ForecastCalendar::BusinessDays
    };
    let engine = ForecastEngine::new(forecast_config).with_calendar(calendar);

    let Some(report) = engine.report(&series) else {
        bail!(
            "Forecast failed for {:?} ({} bars). See log for details.",
            args.input,
            series.len()
        );
    };

    if args.json {
        let out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", out);
        return Ok(());
    }

    println!(
        "\n{} forecast ({} bars: {} train / {} held-out)",
        engine.config().model_type,
        report.history_len,
        report.train_len,
        report.test_len
    );
    println!("  MAE:  {:.4}", report.mae);
    println!("  RMSE: {:.4}", report.rmse);
    println!("  Last close: {:.2}", report.last_observed_close);
    if let Some(change) = report.expected_change_pct() {
        println!("  Expected change over horizon: {:+.2}%", change);
    }
    println!();
    for point in &report.forecast {
        println!("  {}  {:>10.2}", point.date, point.close);
    }

    Ok(())
}

fn print_dashboard(series: &PriceSeries) {
    let table = IndicatorTable::analyze(series, IndicatorProfile::Dashboard);
    let signals = SignalGenerator::new().generate(&table, &series.closes());

    println!("\nIndicators:");
    for name in ["sma_20", "sma_50", "sma_200", "rsi", "macd", "atr", "vwap"] {
        if let Some(value) = table.latest(name) {
            println!("  {:<16} {:.2}", name, value);
        }
    }

    println!("\nSignals:");
    for s in &signals {
        println!("  {:<16} {:<8} {}", s.indicator, s.signal.to_string(), s.reason);
    }

    let levels = support_resistance(series, 20);
    println!("\nResistance: {:?}", levels.resistance);
    println!("Support:    {:?}", levels.support);

    if let Some((high, low)) = series.price_range() {
        println!("\nFibonacci retracement:");
        for (label, level) in fibonacci_retracement(high, low) {
            println!("  {:>6}  {:.2}", label, level);
        }
    }
}
