use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{BacktestError, Bar, BarSeries, PriceField, Result};
use rust_decimal::prelude::ToPrimitive;

/// A provider's view of the series: the current offset plus causal lookups
///
/// Every lookup is relative to the current bar and can only reach
/// backwards, so strategies built on it cannot peek at future bars.
#[derive(Debug, Clone)]
pub struct Cursor {
    series: Arc<BarSeries>,
    index: usize,
}

impl Cursor {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self { series, index: 0 }
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.index = self.series.offset_of(date)?;
        Ok(())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// True when at least `bars` bars precede the current one
    pub fn has_history(&self, bars: usize) -> bool {
        self.index >= bars
    }

    /// Bar `back` steps before the current one
    pub fn bar_back(&self, back: usize) -> Result<&Bar> {
        let index = self
            .index
            .checked_sub(back)
            .ok_or(BacktestError::IndexOutOfRange {
                index: self.index as i64 - back as i64,
                len: self.series.len(),
            })?;
        self.series.bar_at(index)
    }

    pub fn value(&self, field: PriceField) -> Result<f64> {
        self.value_back(0, field)
    }

    pub fn value_back(&self, back: usize, field: PriceField) -> Result<f64> {
        Ok(self
            .bar_back(back)?
            .field(field)
            .to_f64()
            .unwrap_or(f64::NAN))
    }

    /// `len` values ending at the current bar inclusive
    pub fn window(&self, len: usize, field: PriceField) -> Result<Vec<f64>> {
        self.window_back(0, len, field)
    }

    /// `len` values ending `back` bars before the current one
    pub fn window_back(&self, back: usize, len: usize, field: PriceField) -> Result<Vec<f64>> {
        let end = self
            .index
            .checked_sub(back)
            .ok_or(BacktestError::IndexOutOfRange {
                index: self.index as i64 - back as i64,
                len: self.series.len(),
            })?;
        self.series.window(end, len, field)
    }

    /// `len` bars ending `back` bars before the current one
    pub fn bars_back(&self, back: usize, len: usize) -> Result<&[Bar]> {
        let end = self
            .index
            .checked_sub(back)
            .ok_or(BacktestError::IndexOutOfRange {
                index: self.index as i64 - back as i64,
                len: self.series.len(),
            })?;
        self.series.bars_window(end, len)
    }
}

/// Fractional change from `from` to `to`; `None` when `from` is zero
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        None
    } else {
        Some((to - from) / from)
    }
}
