//! Signal providers: the buy/sell oracles the engine replays against

pub mod cursor;
pub mod microstructure;
pub mod momentum;
pub mod oscillator;
pub mod trend;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{BacktestError, BarSeries, PriceField, Result};
use serde::{Deserialize, Serialize};

pub use cursor::Cursor;
pub use microstructure::{AdaptiveSpread, VwapDrift};
pub use momentum::{GapReversion, RangeBreakout, ShortTermMomentum};
pub use oscillator::{MeanReversion, RsiCross};
pub use trend::{AlphaBlend, Average, CloseMomentum, MovingAverageCross};

/// A trading signal queried once per bar
///
/// The engine calls `set_date` first, then `buy` and `sell` exactly once
/// each. Providers must only read bars at or before the current date.
pub trait SignalProvider: Send {
    fn name(&self) -> &str;

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()>;

    fn buy(&mut self) -> Result<bool>;

    fn sell(&mut self) -> Result<bool>;

    /// Price field the signal is computed from
    fn signal_field(&self) -> PriceField {
        PriceField::Close
    }
}

impl<P: SignalProvider + ?Sized> SignalProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        (**self).set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        (**self).buy()
    }

    fn sell(&mut self) -> Result<bool> {
        (**self).sell()
    }

    fn signal_field(&self) -> PriceField {
        (**self).signal_field()
    }
}

/// Serializable description of a concrete strategy and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    CloseMomentum,
    SmaCross {
        fast: usize,
        slow: usize,
    },
    EmaCross {
        fast: usize,
        slow: usize,
    },
    Rsi {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
    MeanReversion {
        window: usize,
        width: f64,
    },
    ShortTermMomentum {
        lookback: usize,
        threshold: f64,
    },
    VwapDrift {
        window: usize,
        uptrend_threshold: f64,
        downtrend_threshold: f64,
    },
    RangeBreakout {
        lookback: usize,
        breakout_factor: f64,
    },
    GapReversion {
        gap_threshold: f64,
        reversion_factor: f64,
    },
    AdaptiveSpread {
        base_spread: f64,
        volatility_window: usize,
        vol_multiplier: f64,
    },
    AlphaBlend,
}

impl StrategyKind {
    /// Every strategy with its default parameters
    pub fn all() -> Vec<StrategyKind> {
        vec![
            StrategyKind::CloseMomentum,
            StrategyKind::SmaCross { fast: 5, slow: 20 },
            StrategyKind::EmaCross { fast: 5, slow: 20 },
            StrategyKind::Rsi {
                period: 14,
                oversold: 30.0,
                overbought: 70.0,
            },
            StrategyKind::MeanReversion {
                window: 20,
                width: 2.0,
            },
            StrategyKind::ShortTermMomentum {
                lookback: 3,
                threshold: 0.005,
            },
            StrategyKind::VwapDrift {
                window: 10,
                uptrend_threshold: 0.05,
                downtrend_threshold: 0.02,
            },
            StrategyKind::RangeBreakout {
                lookback: 3,
                breakout_factor: 1.2,
            },
            StrategyKind::GapReversion {
                gap_threshold: 0.03,
                reversion_factor: 0.5,
            },
            StrategyKind::AdaptiveSpread {
                base_spread: 0.001,
                volatility_window: 10,
                vol_multiplier: 2.0,
            },
            StrategyKind::AlphaBlend,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::CloseMomentum => "close_momentum",
            StrategyKind::SmaCross { .. } => "sma_cross",
            StrategyKind::EmaCross { .. } => "ema_cross",
            StrategyKind::Rsi { .. } => "rsi",
            StrategyKind::MeanReversion { .. } => "mean_reversion",
            StrategyKind::ShortTermMomentum { .. } => "short_term_momentum",
            StrategyKind::VwapDrift { .. } => "vwap_drift",
            StrategyKind::RangeBreakout { .. } => "range_breakout",
            StrategyKind::GapReversion { .. } => "gap_reversion",
            StrategyKind::AdaptiveSpread { .. } => "adaptive_spread",
            StrategyKind::AlphaBlend => "alpha_blend",
        }
    }

    /// Reject window lengths that leave a strategy nothing to compute over
    pub fn validate(&self) -> Result<()> {
        let windows: Vec<(&str, usize)> = match *self {
            StrategyKind::SmaCross { fast, slow } | StrategyKind::EmaCross { fast, slow } => {
                vec![("fast", fast), ("slow", slow)]
            }
            StrategyKind::Rsi { period, .. } => vec![("period", period)],
            StrategyKind::MeanReversion { window, .. } | StrategyKind::VwapDrift { window, .. } => {
                vec![("window", window)]
            }
            StrategyKind::ShortTermMomentum { lookback, .. }
            | StrategyKind::RangeBreakout { lookback, .. } => vec![("lookback", lookback)],
            StrategyKind::AdaptiveSpread {
                volatility_window, ..
            } => vec![("volatility_window", volatility_window)],
            StrategyKind::CloseMomentum
            | StrategyKind::GapReversion { .. }
            | StrategyKind::AlphaBlend => vec![],
        };

        match windows.iter().find(|(_, len)| *len == 0) {
            Some((param, _)) => Err(BacktestError::InvalidParameter(format!(
                "{}: {} must be positive",
                self.name(),
                param
            ))),
            None => Ok(()),
        }
    }

    /// Build a fresh provider over `series`
    pub fn build(&self, series: Arc<BarSeries>) -> Result<Box<dyn SignalProvider>> {
        self.validate()?;
        let provider: Box<dyn SignalProvider> = match *self {
            StrategyKind::CloseMomentum => Box::new(CloseMomentum::new(series)),
            StrategyKind::SmaCross { fast, slow } => {
                Box::new(MovingAverageCross::new(series, Average::Simple, fast, slow))
            }
            StrategyKind::EmaCross { fast, slow } => Box::new(MovingAverageCross::new(
                series,
                Average::Exponential,
                fast,
                slow,
            )),
            StrategyKind::Rsi {
                period,
                oversold,
                overbought,
            } => Box::new(RsiCross::new(series, period, oversold, overbought)),
            StrategyKind::MeanReversion { window, width } => {
                Box::new(MeanReversion::new(series, window, width))
            }
            StrategyKind::ShortTermMomentum {
                lookback,
                threshold,
            } => Box::new(ShortTermMomentum::new(series, lookback, threshold)),
            StrategyKind::VwapDrift {
                window,
                uptrend_threshold,
                downtrend_threshold,
            } => Box::new(VwapDrift::new(
                series,
                window,
                uptrend_threshold,
                downtrend_threshold,
            )),
            StrategyKind::RangeBreakout {
                lookback,
                breakout_factor,
            } => Box::new(RangeBreakout::new(series, lookback, breakout_factor)),
            StrategyKind::GapReversion {
                gap_threshold,
                reversion_factor,
            } => Box::new(GapReversion::new(series, gap_threshold, reversion_factor)),
            StrategyKind::AdaptiveSpread {
                base_spread,
                volatility_window,
                vol_multiplier,
            } => Box::new(AdaptiveSpread::new(
                series,
                base_spread,
                volatility_window,
                vol_multiplier,
            )),
            StrategyKind::AlphaBlend => Box::new(AlphaBlend::new(series)),
        };
        Ok(provider)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = BacktestError;

    /// Looks a strategy up by name, with default parameters
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        StrategyKind::all()
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| BacktestError::InvalidParameter(format!("Unknown strategy: {}", s)))
    }
}
