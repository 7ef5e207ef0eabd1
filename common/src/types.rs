use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BacktestError;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn field(&self, field: PriceField) -> Decimal {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
            PriceField::Volume => self.volume,
        }
    }
}

/// Bar column a signal provider trades at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::Volume => "Volume",
        };
        f.pad(name)
    }
}

impl FromStr for PriceField {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            "volume" => Ok(PriceField::Volume),
            other => Err(BacktestError::InvalidParameter(format!(
                "Unknown price field: {}",
                other
            ))),
        }
    }
}

/// Last action taken during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    #[default]
    Nothing,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Buy => "Buy",
            Action::Sell => "Sell",
            Action::Nothing => "Nothing",
        };
        f.pad(name)
    }
}

/// One row of the equity log, written once per simulated step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityRecord {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    /// Bar value in the provider's signal field, used for fills and marks
    pub price: Decimal,
    pub position_qty: Decimal,
    pub cash: Decimal,
    /// cash + position_qty * price
    pub equity: Decimal,
}

/// Performance metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub final_equity: f64,
    pub profit: f64,
    // Returns
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    // Risk metrics
    pub annualized_volatility_pct: f64,
    /// NaN when volatility is zero
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    // Benchmark
    pub buy_and_hold_return_pct: f64,
    // Activity
    pub buy_count: u32,
    pub sell_count: u32,
}

/// Outcome of one strategy's full pass over the series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRun {
    pub name: String,
    pub report: PerformanceReport,
    pub records: Vec<EquityRecord>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: Decimal,
    pub final_equity: Decimal,
    pub bankrupt: bool,
    pub execution_time_ms: u64,
}

/// A strategy whose run was aborted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub name: String,
    pub error: String,
}

/// Collected results of a batch, ranked by total return
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub runs: Vec<StrategyRun>,
    pub failures: Vec<StrategyFailure>,
    pub buy_and_hold_return_pct: f64,
}
