use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{BarSeries, PriceField, Result};

use super::cursor::Cursor;
use super::SignalProvider;
use crate::indicators::{bollinger_bands, rsi, BollingerBands};

/// Reading used before the first full RSI window
const NEUTRAL_RSI: f64 = 50.0;

/// RSI threshold crossings: buy up through `oversold`, sell down through `overbought`
#[derive(Debug, Clone)]
pub struct RsiCross {
    cursor: Cursor,
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl RsiCross {
    pub fn new(series: Arc<BarSeries>, period: usize, oversold: f64, overbought: f64) -> Self {
        Self {
            cursor: Cursor::new(series),
            period,
            oversold,
            overbought,
        }
    }

    fn rsi_back(&self, back: usize) -> Result<f64> {
        if !self.cursor.has_history(self.period + back) {
            return Ok(NEUTRAL_RSI);
        }
        let closes = self
            .cursor
            .window_back(back, self.period + 1, PriceField::Close)?;
        Ok(rsi(&closes).unwrap_or(NEUTRAL_RSI))
    }

    fn readings(&self) -> Result<Option<(f64, f64)>> {
        if !self.cursor.has_history(1) {
            return Ok(None);
        }
        Ok(Some((self.rsi_back(1)?, self.rsi_back(0)?)))
    }
}

impl SignalProvider for RsiCross {
    fn name(&self) -> &str {
        "rsi"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self
            .readings()?
            .is_some_and(|(prev, now)| prev <= self.oversold && now > self.oversold))
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self
            .readings()?
            .is_some_and(|(prev, now)| prev >= self.overbought && now < self.overbought))
    }
}

/// Bollinger reversion: buy below the lower band, sell back at the mean
#[derive(Debug, Clone)]
pub struct MeanReversion {
    cursor: Cursor,
    window: usize,
    width: f64,
}

impl MeanReversion {
    pub fn new(series: Arc<BarSeries>, window: usize, width: f64) -> Self {
        Self {
            cursor: Cursor::new(series),
            window,
            width,
        }
    }

    fn close_and_bands(&self) -> Result<Option<(f64, BollingerBands)>> {
        if !self.cursor.has_history(self.window) {
            return Ok(None);
        }
        let window = self.cursor.window(self.window, PriceField::Close)?;
        let close = self.cursor.value(PriceField::Close)?;
        Ok(bollinger_bands(&window, self.width).map(|bands| (close, bands)))
    }
}

impl SignalProvider for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        self.cursor.set_date(date)
    }

    fn buy(&mut self) -> Result<bool> {
        Ok(self
            .close_and_bands()?
            .is_some_and(|(close, bands)| close < bands.lower))
    }

    fn sell(&mut self) -> Result<bool> {
        Ok(self
            .close_and_bands()?
            .is_some_and(|(close, bands)| close >= bands.middle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bars_from_closes;

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
    fn test_rsi_buys_on_recovery_from_oversold() {
        // Five straight losses, then one gain: RSI(3) goes 0 -> above 30
        let closes = [20.0, 19.0, 18.0, 17.0, 16.0, 15.0, 19.0];
        let s = series(&closes);
        let mut p = RsiCross::new(s.clone(), 3, 30.0, 70.0);

        let buys: Vec<usize> = (0..closes.len())
            .filter(|&i| signals_at(&mut p, &s, i).0)
            .collect();
        assert_eq!(buys, vec![6]);
    }

    #[test]
    fn test_rsi_sells_on_fall_from_overbought() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 11.0];
        let s = series(&closes);
        let mut p = RsiCross::new(s.clone(), 3, 30.0, 70.0);

        let sells: Vec<usize> = (0..closes.len())
            .filter(|&i| signals_at(&mut p, &s, i).1)
            .collect();
        assert_eq!(sells, vec![6]);
    }

    #[test]
    fn test_rsi_is_neutral_during_warmup() {
        // Neutral 50 on both sides of the first full window: no crossing
        let s = series(&[10.0, 11.0, 12.0]);
        let mut p = RsiCross::new(s.clone(), 14, 30.0, 70.0);
        for i in 0..3 {
            assert_eq!(signals_at(&mut p, &s, i), (false, false));
        }
    }

    #[test]
    fn test_mean_reversion() {
        let mut closes = vec![100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 100.0];
        closes.push(80.0); // below the lower band
        closes.push(105.0); // back above the mean
        let s = series(&closes);
        let mut p = MeanReversion::new(s.clone(), 10, 2.0);

        assert_eq!(signals_at(&mut p, &s, 9), (false, false)); // warming up
        assert_eq!(signals_at(&mut p, &s, 10), (true, false));
        assert_eq!(signals_at(&mut p, &s, 11), (false, true));
    }
}
