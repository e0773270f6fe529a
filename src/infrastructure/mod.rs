pub mod csv_price_source;

pub use csv_price_source::CsvPriceSource;
