//! Short-horizon price-action strategies

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{BarSeries, PriceField, Result};
use rust_decimal::prelude::ToPrimitive;

use super::cursor::{pct_change, Cursor};
use super::SignalProvider;

/// Move over `lookback` bars beyond a threshold, confirmed by the last bar
#[derive(Debug, Clone)]
pub struct ShortTermMomentum {
    cursor: Cursor,
    lookback: usize,
    threshold: f64,
}

/// Lookback change and last-bar change at the current bar
#[derive(Debug, Clone, Copy)]
struct Changes {
    lookback: f64,
    recent: f64,
}

impl ShortTermMomentum {
    pub fn new(series: Arc<BarSeries>, lookback: usize, threshold: f64) -> Self {
        Self {
            cursor: Cursor::new(series),
            lookback,
            threshold,
        }
    }

    fn changes(&self) -> Result<Option<Changes>> {
        if self.lookback == 0 || !self.cursor.has_history(self.lookback) {
            return Ok(None);
        }
        let current = self.cursor.value(PriceField::Close)?;
        let past = self.cursor.value_back(self.lookback, PriceField::Close)?;
        let recent = self.cursor.value_back(1, PriceField::Close)?;

        Ok(pct_change(past, current)
            .zip(pct_change(recent, current))
            .map(|(lookback, recent)| Changes { lookback, recent }))
    }
}

impl SignalProvider for ShortTermMomentum {
    fn name(&self) -> &str {
        "short_term_momentum"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self
            .changes()?
            .is_some_and(|c| c.lookback > self.threshold && c.recent > 0.0))
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self
            .changes()?
            .is_some_and(|c| c.lookback < -self.threshold && c.recent < 0.0))
    }
}

/// Breakout beyond the prior `lookback` bars' high/low range, stretched by
/// `breakout_factor`
#[derive(Debug, Clone)]
pub struct RangeBreakout {
    cursor: Cursor,
    lookback: usize,
    breakout_factor: f64,
}

#[derive(Debug, Clone, Copy)]
struct Range {
    high: f64,
    low: f64,
}

impl RangeBreakout {
    pub fn new(series: Arc<BarSeries>, lookback: usize, breakout_factor: f64) -> Self {
        Self {
            cursor: Cursor::new(series),
            lookback,
            breakout_factor,
        }
    }

    /// Range of the bars strictly before the current one
    fn prior_range(&self) -> Result<Option<Range>> {
        if self.lookback == 0 || !self.cursor.has_history(self.lookback) {
            return Ok(None);
        }
        let bars = self.cursor.bars_back(1, self.lookback)?;
        let range = bars.iter().fold(
            Range {
                high: f64::NEG_INFINITY,
                low: f64::INFINITY,
            },
            |r, bar| Range {
                high: r.high.max(bar.high.to_f64().unwrap_or(f64::NAN)),
                low: r.low.min(bar.low.to_f64().unwrap_or(f64::NAN)),
            },
        );
        Ok(Some(range))
    }

    fn closes(&self) -> Result<(f64, f64)> {
        Ok((
            self.cursor.value_back(1, PriceField::Close)?,
            self.cursor.value(PriceField::Close)?,
        ))
    }
}

impl SignalProvider for RangeBreakout {
    fn name(&self) -> &str {
        "range_breakout"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        let Some(range) = self.prior_range()? else {
            return Ok(false);
        };
        let level = range.high + (range.high - range.low) * (self.breakout_factor - 1.0);
        let (prev, close) = self.closes()?;
        Ok(close > level && close > prev)
    }

    fn sell(&mut self) -> Result<bool> {
        let Some(range) = self.prior_range()? else {
            return Ok(false);
        };
        let level = range.low - (range.high - range.low) * (self.breakout_factor - 1.0);
        let (prev, close) = self.closes()?;
        Ok(close < level && close < prev)
    }
}

/// Fades overnight gaps that have started, but not finished, reverting
#[derive(Debug, Clone)]
pub struct GapReversion {
    cursor: Cursor,
    gap_threshold: f64,
    reversion_factor: f64,
}

#[derive(Debug, Clone, Copy)]
struct Gap {
    overnight: f64,
    intraday: f64,
}

impl GapReversion {
    pub fn new(series: Arc<BarSeries>, gap_threshold: f64, reversion_factor: f64) -> Self {
        Self {
            cursor: Cursor::new(series),
            gap_threshold,
            reversion_factor,
        }
    }

    fn gap(&self) -> Result<Option<Gap>> {
        if !self.cursor.has_history(1) {
            return Ok(None);
        }
        let prev_close = self.cursor.value_back(1, PriceField::Close)?;
        let open = self.cursor.value(PriceField::Open)?;
        let close = self.cursor.value(PriceField::Close)?;

        Ok(pct_change(prev_close, open)
            .zip(pct_change(open, close))
            .map(|(overnight, intraday)| Gap {
                overnight,
                intraday,
            }))
    }
}

impl SignalProvider for GapReversion {
    fn name(&self) -> &str {
        "gap_reversion"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self.gap()?.is_some_and(|g| {
            g.overnight < -self.gap_threshold
                && g.intraday > 0.0
                && g.intraday < -g.overnight * self.reversion_factor
        }))
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self.gap()?.is_some_and(|g| {
            g.overnight > self.gap_threshold
                && g.intraday < 0.0
                && g.intraday > -g.overnight * self.reversion_factor
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bars_from_closes;
    use common::Bar;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn series(closes: &[f64]) -> Arc<BarSeries> {
        Arc::new(BarSeries::new(bars_from_closes(closes)).unwrap())
    }

    fn signals_at<P: SignalProvider>(
        provider: &mut P,
        series: &BarSeries,
        index: usize,
    ) -> (bool, bool) {
        provider.set_date(series.date_at(index).unwrap()).unwrap();
        (provider.buy().unwrap(), provider.sell().unwrap())
    }

    #[test]
    fn test_short_term_momentum() {
        let closes = [100.0, 100.0, 100.0, 101.0, 100.8, 98.0, 97.0];
        let s = series(&closes);
        let mut p = ShortTermMomentum::new(s.clone(), 3, 0.005);

        assert_eq!(signals_at(&mut p, &s, 2), (false, false)); // lookback unavailable
        assert_eq!(signals_at(&mut p, &s, 3), (true, false)); // +1% over 3, up today
        assert_eq!(signals_at(&mut p, &s, 4), (false, false)); // up over 3 bars, down today
        assert_eq!(signals_at(&mut p, &s, 6), (false, true)); // -4% over 3, down today
    }

    #[test]
    fn test_range_breakout() {
        // bars_from_closes spans open..close, so the prior range of
        // closes 100,102,101 (opens 100,100,102) is 100..102
        let closes = [100.0, 102.0, 101.0, 103.0, 98.0];
        let s = series(&closes);
        let mut p = RangeBreakout::new(s.clone(), 3, 1.2);

        // Breakout level 102 + 2 * 0.2 = 102.4
        assert_eq!(signals_at(&mut p, &s, 3), (true, false));
        // Prior range 100..103 (bars 1-3), breakdown level 100 - 0.6 = 99.4
        assert_eq!(signals_at(&mut p, &s, 4), (false, true));
    }

    fn bar(day: i64, open: Decimal, close: Decimal) -> Bar {
        let start = bars_from_closes(&[1.0])[0].timestamp;
        Bar::new(
            start + chrono::Duration::days(day),
            open,
            open.max(close),
            open.min(close),
            close,
            dec!(1000),
        )
    }

    #[test]
    fn test_gap_reversion() {
        let s = Arc::new(
            BarSeries::new(vec![
                bar(0, dec!(100), dec!(100)),
                bar(1, dec!(95), dec!(96)),   // gap down 5%, recovered ~1%
                bar(2, dec!(101), dec!(100)), // gap up ~5%, faded ~1%
                bar(3, dec!(100), dec!(101)), // no gap
            ])
            .unwrap(),
        );
        let mut p = GapReversion::new(s.clone(), 0.03, 0.5);

        assert_eq!(signals_at(&mut p, &s, 0), (false, false));
        assert_eq!(signals_at(&mut p, &s, 1), (true, false));
        assert_eq!(signals_at(&mut p, &s, 2), (false, true));
        assert_eq!(signals_at(&mut p, &s, 3), (false, false));
    }
}
