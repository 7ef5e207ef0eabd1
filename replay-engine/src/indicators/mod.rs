//! Point-in-time indicators over causal price windows

pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod vwap;

pub use bollinger::{bollinger_bands, returns_std_dev, std_dev, BollingerBands};
pub use ema::ema;
pub use rsi::rsi;
pub use sma::sma;
pub use vwap::typical_price_vwap;
