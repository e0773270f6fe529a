//! Price history from CSV exports.
//!
//! Accepts the common `Date,Open,High,Low,Close,Volume` layout (any header
//! case, extra columns such as `Adj Close` ignored). Timestamps are cut to
//! their date part.

use crate::domain::market::price_series::{PriceBar, PriceSeries};
use crate::domain::ports::PriceHistorySource;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct BarRecord {
    #[serde(alias = "Date", alias = "DATE", alias = "timestamp", alias = "Datetime")]
    date: String,
    #[serde(alias = "Open", alias = "OPEN")]
    open: f64,
    #[serde(alias = "High", alias = "HIGH")]
    high: f64,
    #[serde(alias = "Low", alias = "LOW")]
    low: f64,
    #[serde(alias = "Close", alias = "CLOSE")]
    close: f64,
    #[serde(alias = "Volume", alias = "VOLUME")]
    volume: f64,
}

impl BarRecord {
    fn into_bar(self) -> Result<PriceBar> {
        let raw = self.date.trim();
        let day = raw.get(..10).unwrap_or(raw);
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}'", self.date))?;
        Ok(PriceBar::new(
            date, self.open, self.high, self.low, self.close, self.volume,
        ))
    }
}

/// Reads `<dir>/<SYMBOL>.csv` files
pub struct CsvPriceSource {
    dir: PathBuf,
}

impl CsvPriceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load a single file
    pub fn load(path: &Path) -> Result<PriceSeries> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let series = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read price history from {:?}", path))?;
        info!("Loaded {} bars from {:?}", series.len(), path);
        Ok(series)
    }

    /// Parse CSV rows; rows may come in any date order
    pub fn from_reader<R: Read>(reader: R) -> Result<PriceSeries> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut bars = Vec::new();

        for (line, result) in rdr.deserialize::<BarRecord>().enumerate() {
            let record = result.with_context(|| format!("Bad record at row {}", line + 1))?;
            bars.push(record.into_bar()?);
        }

        bars.sort_by_key(|b| b.date);
        debug!("Parsed {} CSV rows", bars.len());

        PriceSeries::new(bars).context("Invalid price history")
    }
}

impl PriceHistorySource for CsvPriceSource {
    fn load_history(&self, symbol: &str) -> Result<PriceSeries> {
        let path = self.dir.join(format!("{}.csv", symbol.to_uppercase()));
        Self::load(&path)
    }
}
