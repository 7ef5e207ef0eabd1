use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Date not found in series: {date}")]
    DateNotFound { date: DateTime<Utc> },

    #[error("Index {index} out of range for series of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Offset {index} is before the warm-up offset {warmup}")]
    BeforeWarmup { index: usize, warmup: usize },

    #[error("Signal provider '{provider}' failed: {reason}")]
    ProviderFault { provider: String, reason: String },

    #[error("Order size search exhausted: cash {cash} cannot cover notional {notional}")]
    OrderSizeExhausted { cash: Decimal, notional: Decimal },

    #[error("Bars are not strictly ascending at index {index}")]
    UnorderedSeries { index: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("CSV parse error: {0}")]
    CsvError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BacktestError {
    /// Errors that end a single backtest run without affecting sibling runs.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            BacktestError::ProviderFault { .. }
                | BacktestError::OrderSizeExhausted { .. }
                | BacktestError::DateNotFound { .. }
                | BacktestError::IndexOutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BacktestError>;
