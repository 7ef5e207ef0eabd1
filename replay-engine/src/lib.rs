pub mod account;
pub mod batch;
pub mod data;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod signals;

pub use account::{Account, OrderSizePolicy};
pub use batch::BatchRunner;
pub use data::{generate_synthetic_bars, generate_synthetic_bars_seeded, load_file};
pub use engine::BacktestEngine;
pub use metrics::PerformanceAnalyzer;
pub use signals::{SignalProvider, StrategyKind};

// Re-export common types
pub use common::{
    Action, BacktestConfig, BacktestError, Bar, BarSeries, BatchReport, EquityRecord,
    PerformanceReport, PriceField, Result, StrategyFailure, StrategyRun,
};
