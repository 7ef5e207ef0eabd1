use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{BacktestError, Result};
use crate::types::{Bar, PriceField};

/// Date-indexed, strictly ascending sequence of bars
#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        if let Some(pos) = bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(BacktestError::UnorderedSeries { index: pos + 1 });
        }
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Offset of the bar stamped exactly `date`
    pub fn offset_of(&self, date: DateTime<Utc>) -> Result<usize> {
        self.bars
            .binary_search_by_key(&date, |b| b.timestamp)
            .map_err(|_| BacktestError::DateNotFound { date })
    }

    pub fn bar_at(&self, index: usize) -> Result<&Bar> {
        self.bars.get(index).ok_or(BacktestError::IndexOutOfRange {
            index: index as i64,
            len: self.bars.len(),
        })
    }

    pub fn date_at(&self, index: usize) -> Result<DateTime<Utc>> {
        self.bar_at(index).map(|b| b.timestamp)
    }

    pub fn value(&self, index: usize, field: PriceField) -> Result<Decimal> {
        self.bar_at(index).map(|b| b.field(field))
    }

    /// `len` bars ending at `end` inclusive
    ///
    /// Fails with `IndexOutOfRange` rather than clamping when the window
    /// would start before the first bar or end past the last one.
    pub fn bars_window(&self, end: usize, len: usize) -> Result<&[Bar]> {
        if end >= self.bars.len() {
            return Err(BacktestError::IndexOutOfRange {
                index: end as i64,
                len: self.bars.len(),
            });
        }
        let start = end as i64 + 1 - len as i64;
        if start < 0 {
            return Err(BacktestError::IndexOutOfRange {
                index: start,
                len: self.bars.len(),
            });
        }
        Ok(&self.bars[start as usize..=end])
    }

    /// Field values of `bars_window(end, len)` as floats for indicator math
    pub fn window(&self, end: usize, len: usize, field: PriceField) -> Result<Vec<f64>> {
        Ok(self
            .bars_window(end, len)?
            .iter()
            .map(|b| b.field(field).to_f64().unwrap_or(f64::NAN))
            .collect())
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.close.to_f64().unwrap_or(f64::NAN))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn make_series(closes: &[Decimal]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(start + Duration::days(i as i64), c, c, c, c, dec!(100)))
            .collect();
        BarSeries::new(bars).unwrap()
    }

    #[test]
    fn test_offset_of() {
        let series = make_series(&[dec!(10), dec!(11), dec!(12)]);
        let date = series.date_at(2).unwrap();
        assert_eq!(series.offset_of(date).unwrap(), 2);

        let missing = date + Duration::hours(1);
        assert!(matches!(
            series.offset_of(missing),
            Err(BacktestError::DateNotFound { .. })
        ));
    }

    #[test]
    fn test_bar_at_out_of_range() {
        let series = make_series(&[dec!(10), dec!(11)]);
        assert!(matches!(
            series.bar_at(2),
            Err(BacktestError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_window_rejects_lookback_before_start() {
        let series = make_series(&[dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);

        assert_eq!(series.window(4, 3, PriceField::Close).unwrap(), vec![3.0, 4.0, 5.0]);
        assert_eq!(series.window(2, 3, PriceField::Close).unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            series.window(1, 3, PriceField::Close),
            Err(BacktestError::IndexOutOfRange { index: -1, len: 5 })
        ));
        assert!(matches!(
            series.window(5, 1, PriceField::Close),
            Err(BacktestError::IndexOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn test_rejects_unordered_bars() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bar = |d: i64| Bar::new(start + Duration::days(d), dec!(1), dec!(1), dec!(1), dec!(1), dec!(1));
        let result = BarSeries::new(vec![bar(0), bar(2), bar(1)]);
        assert!(matches!(result, Err(BacktestError::UnorderedSeries { index: 2 })));

        let result = BarSeries::new(vec![bar(0), bar(0)]);
        assert!(matches!(result, Err(BacktestError::UnorderedSeries { index: 1 })));
    }
}
