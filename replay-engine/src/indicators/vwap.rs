use common::Bar;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Volume-weighted average of the typical price `(high + low + close) / 3`
///
/// `None` when the window traded no volume.
pub fn typical_price_vwap(bars: &[Bar]) -> Option<f64> {
    let (price_volume, volume) = bars.iter().fold((0.0, 0.0), |(pv, v), bar| {
        let typical = ((bar.high + bar.low + bar.close) / Decimal::from(3))
            .to_f64()
            .unwrap_or(0.0);
        let vol = bar.volume.to_f64().unwrap_or(0.0);
        (pv + typical * vol, v + vol)
    });

    if volume > 0.0 {
        Some(price_volume / volume)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(high: Decimal, low: Decimal, close: Decimal, volume: Decimal) -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            close,
            high,
            low,
            close,
            volume,
        )
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        let bars = [
            bar(dec!(12), dec!(9), dec!(9), dec!(100)),  // typical 10
            bar(dec!(21), dec!(19), dec!(20), dec!(300)), // typical 20
        ];
        let vwap = typical_price_vwap(&bars).unwrap();
        assert_relative_eq!(vwap, 17.5, epsilon = 1e-12);
    }

    #[test]
    fn test_vwap_zero_volume() {
        let bars = [bar(dec!(12), dec!(9), dec!(9), dec!(0))];
        assert_eq!(typical_price_vwap(&bars), None);
    }
}
