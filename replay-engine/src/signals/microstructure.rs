//! Strategies reading intrabar structure: VWAP deviation and bar range

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{BarSeries, PriceField, Result};

use super::cursor::{pct_change, Cursor};
use super::SignalProvider;
use crate::indicators::{returns_std_dev, typical_price_vwap};

/// Buy a rising close sitting below VWAP, sell a falling close stretched above it
#[derive(Debug, Clone)]
pub struct VwapDrift {
    cursor: Cursor,
    window: usize,
    uptrend_threshold: f64,
    downtrend_threshold: f64,
}

#[derive(Debug, Clone, Copy)]
struct Drift {
    vwap: f64,
    close: f64,
    change: f64,
}

impl VwapDrift {
    pub fn new(
        series: Arc<BarSeries>,
        window: usize,
        uptrend_threshold: f64,
        downtrend_threshold: f64,
    ) -> Self {
        Self {
            cursor: Cursor::new(series),
            window,
            uptrend_threshold,
            downtrend_threshold,
        }
    }

    fn drift(&self) -> Result<Option<Drift>> {
        if self.window == 0 || !self.cursor.has_history(self.window) {
            return Ok(None);
        }
        let Some(vwap) = typical_price_vwap(self.cursor.bars_back(0, self.window)?) else {
            return Ok(None);
        };
        if vwap == 0.0 {
            return Ok(None);
        }
        let close = self.cursor.value(PriceField::Close)?;
        let prev = self.cursor.value_back(1, PriceField::Close)?;

        Ok(pct_change(prev, close).map(|change| Drift {
            vwap,
            close,
            change,
        }))
    }
}

impl SignalProvider for VwapDrift {
    fn name(&self) -> &str {
        "vwap_drift"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self.drift()?.is_some_and(|d| {
            (d.vwap - d.close) / d.vwap > self.downtrend_threshold && d.change > 0.0
        }))
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self.drift()?.is_some_and(|d| {
            (d.close - d.vwap) / d.vwap > self.uptrend_threshold && d.change < 0.0
        }))
    }
}

/// Where in the bar the close must sit to buy (below) or sell (above)
const LOWER_ZONE: f64 = 0.35;
const UPPER_ZONE: f64 = 0.55;

/// Trades bars whose high/low range is wider than a volatility-scaled spread
#[derive(Debug, Clone)]
pub struct AdaptiveSpread {
    cursor: Cursor,
    base_spread: f64,
    volatility_window: usize,
    vol_multiplier: f64,
}

#[derive(Debug, Clone, Copy)]
struct BarShape {
    high: f64,
    low: f64,
    close: f64,
}

impl BarShape {
    fn level(&self, fraction: f64) -> f64 {
        self.low + (self.high - self.low) * fraction
    }
}

impl AdaptiveSpread {
    pub fn new(
        series: Arc<BarSeries>,
        base_spread: f64,
        volatility_window: usize,
        vol_multiplier: f64,
    ) -> Self {
        Self {
            cursor: Cursor::new(series),
            base_spread,
            volatility_window,
            vol_multiplier,
        }
    }

    /// The current bar when its range beats the adaptive spread
    fn wide_bar(&self) -> Result<Option<BarShape>> {
        if self.volatility_window == 0 || !self.cursor.has_history(self.volatility_window) {
            return Ok(None);
        }
        let closes = self
            .cursor
            .window(self.volatility_window + 1, PriceField::Close)?;
        let volatility = returns_std_dev(&closes).unwrap_or(0.0);
        let spread = self.base_spread * (1.0 + self.vol_multiplier * volatility);

        let shape = BarShape {
            high: self.cursor.value(PriceField::High)?,
            low: self.cursor.value(PriceField::Low)?,
            close: self.cursor.value(PriceField::Close)?,
        };
        let market_spread = match pct_change(shape.low, shape.high) {
            Some(s) => s,
            None => return Ok(None),
        };

        Ok((market_spread > spread).then_some(shape))
    }
}

impl SignalProvider for AdaptiveSpread {
    fn name(&self) -> &str {
        "adaptive_spread"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self
            .wide_bar()?
            .is_some_and(|bar| bar.close < bar.level(LOWER_ZONE)))
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self
            .wide_bar()?
            .is_some_and(|bar| bar.close > bar.level(UPPER_ZONE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Bar;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn bar(day: i64, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        let start = crate::data::bars_from_closes(&[1.0])[0].timestamp;
        Bar::new(
            start + chrono::Duration::days(day),
            close,
            high,
            low,
            close,
            dec!(1000),
        )
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
    fn test_vwap_drift() {
        // Flat bars at 100, then a dip that starts to recover, then a spike
        // that starts to fade
        let mut bars: Vec<Bar> = (0..10)
            .map(|d| bar(d, dec!(100), dec!(100), dec!(100)))
            .collect();
        bars.push(bar(10, dec!(90), dec!(90), dec!(90)));
        bars.push(bar(11, dec!(91), dec!(91), dec!(91)));
        bars.push(bar(12, dec!(130), dec!(130), dec!(130)));
        bars.push(bar(13, dec!(125), dec!(125), dec!(125)));
        let s = Arc::new(BarSeries::new(bars).unwrap());
        let mut p = VwapDrift::new(s.clone(), 10, 0.05, 0.02);

        assert_eq!(signals_at(&mut p, &s, 9), (false, false)); // warming up
        assert_eq!(signals_at(&mut p, &s, 10), (false, false)); // below VWAP but falling
        assert_eq!(signals_at(&mut p, &s, 11), (true, false));
        assert_eq!(signals_at(&mut p, &s, 12), (false, false)); // above VWAP but rising
        assert_eq!(signals_at(&mut p, &s, 13), (false, true));
    }

    #[test]
    fn test_adaptive_spread() {
        // Flat closes keep volatility at zero, so the spread is the base 0.1%
        let mut bars: Vec<Bar> = (0..10)
            .map(|d| bar(d, dec!(100), dec!(100), dec!(100)))
            .collect();
        bars.push(bar(10, dec!(102), dec!(98), dec!(100))); // mid-range close
        let s = Arc::new(BarSeries::new(bars.clone()).unwrap());
        let mut p = AdaptiveSpread::new(s.clone(), 0.001, 10, 2.0);

        assert_eq!(signals_at(&mut p, &s, 9), (false, false)); // warming up
        assert_eq!(signals_at(&mut p, &s, 10), (false, false));

        bars[10] = bar(10, dec!(104), dec!(99), dec!(100)); // close near the low
        let s = Arc::new(BarSeries::new(bars.clone()).unwrap());
        let mut p = AdaptiveSpread::new(s.clone(), 0.001, 10, 2.0);
        assert_eq!(signals_at(&mut p, &s, 10), (true, false));

        bars[10] = bar(10, dec!(101), dec!(96), dec!(100)); // close near the high
        let s = Arc::new(BarSeries::new(bars).unwrap());
        let mut p = AdaptiveSpread::new(s.clone(), 0.001, 10, 2.0);
        assert_eq!(signals_at(&mut p, &s, 10), (false, true));
    }
}
