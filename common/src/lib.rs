pub mod config;
pub mod error;
pub mod series;
pub mod types;

pub use config::BacktestConfig;
pub use error::{BacktestError, Result};
pub use series::BarSeries;
pub use types::*;
