//! Price-direction and moving-average crossover strategies

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{BarSeries, PriceField, Result};

use super::cursor::Cursor;
use super::SignalProvider;
use crate::indicators::{ema, sma};

/// Fast/slow pair at one bar
#[derive(Debug, Clone, Copy)]
struct Pair {
    fast: f64,
    slow: f64,
}

fn crossed_above(prev: Pair, now: Pair) -> bool {
    prev.fast <= prev.slow && now.fast > now.slow
}

fn crossed_below(prev: Pair, now: Pair) -> bool {
    prev.fast >= prev.slow && now.fast < now.slow
}

/// Follows the last close-to-close move
#[derive(Debug, Clone)]
pub struct CloseMomentum {
    cursor: Cursor,
}

impl CloseMomentum {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self {
            cursor: Cursor::new(series),
        }
    }

    fn closes(&self) -> Result<Option<(f64, f64)>> {
        if !self.cursor.has_history(1) {
            return Ok(None);
        }
        let prev = self.cursor.value_back(1, PriceField::Close)?;
        let curr = self.cursor.value(PriceField::Close)?;
        Ok(Some((prev, curr)))
    }
}

impl SignalProvider for CloseMomentum {
    fn name(&self) -> &str {
        "close_momentum"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self.closes()?.is_some_and(|(prev, curr)| curr > prev))
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self.closes()?.is_some_and(|(prev, curr)| curr < prev))
    }
}

/// Which average a [`MovingAverageCross`] compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Average {
    Simple,
    Exponential,
}

/// Fast/slow moving-average crossover
#[derive(Debug, Clone)]
pub struct MovingAverageCross {
    cursor: Cursor,
    average: Average,
    fast: usize,
    slow: usize,
}

impl MovingAverageCross {
    pub fn new(series: Arc<BarSeries>, average: Average, fast: usize, slow: usize) -> Self {
        Self {
            cursor: Cursor::new(series),
            average,
            fast,
            slow,
        }
    }

    fn average_back(&self, back: usize, period: usize) -> Result<Option<f64>> {
        let window = self.cursor.window_back(back, period, PriceField::Close)?;
        Ok(match self.average {
            Average::Simple => sma(&window),
            Average::Exponential => ema(&window),
        })
    }

    fn pair_back(&self, back: usize) -> Result<Option<Pair>> {
        let fast = self.average_back(back, self.fast)?;
        let slow = self.average_back(back, self.slow)?;
        Ok(fast.zip(slow).map(|(fast, slow)| Pair { fast, slow }))
    }

    /// Current and previous pair, once both slow windows are available
    fn pairs(&self) -> Result<Option<(Pair, Pair)>> {
        let longest = self.fast.max(self.slow);
        if !self.cursor.has_history(longest) {
            return Ok(None);
        }
        Ok(self.pair_back(1)?.zip(self.pair_back(0)?))
    }

    /// Fast above slow on the current bar
    fn fast_above(&self) -> Result<Option<bool>> {
        if !self.cursor.has_history(self.fast.max(self.slow).saturating_sub(1)) {
            return Ok(None);
        }
        Ok(self.pair_back(0)?.map(|p| p.fast > p.slow))
    }

    fn fast_below(&self) -> Result<Option<bool>> {
        if !self.cursor.has_history(self.fast.max(self.slow).saturating_sub(1)) {
            return Ok(None);
        }
        Ok(self.pair_back(0)?.map(|p| p.fast < p.slow))
    }
}

impl SignalProvider for MovingAverageCross {
    fn name(&self) -> &str {
        match self.average {
            Average::Simple => "sma_cross",
            Average::Exponential => "ema_cross",
        }
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self.pairs()?.is_some_and(|(prev, now)| crossed_above(prev, now)))
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self.pairs()?.is_some_and(|(prev, now)| crossed_below(prev, now)))
    }
}

/// Confluence filter: EMA trend plus close momentum plus an SMA crossover
#[derive(Debug, Clone)]
pub struct AlphaBlend {
    trend: MovingAverageCross,
    momentum: CloseMomentum,
    cross: MovingAverageCross,
}

impl AlphaBlend {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self {
            trend: MovingAverageCross::new(series.clone(), Average::Exponential, 5, 20),
            momentum: CloseMomentum::new(series.clone()),
            cross: MovingAverageCross::new(series, Average::Simple, 5, 20),
        }
    }
}

impl SignalProvider for AlphaBlend {
    fn name(&self) -> &str {
        "alpha_blend"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.trend.set_date(date)?;
        self.momentum.set_date(date)?;
        self.cross.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self.trend.fast_above()?.unwrap_or(false)
            && self.momentum.buy()?
            && self.cross.buy()?)
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self.trend.fast_below()?.unwrap_or(false)
            && self.momentum.sell()?
            && self.cross.sell()?)
    }
}
