use chrono::{DateTime, Duration, TimeZone, Utc};
use common::Bar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

fn fixture_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn to_price(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(4)
}

/// Generate random-walk daily bars for demos
pub fn generate_synthetic_bars(days: usize, initial_price: f64) -> Vec<Bar> {
    let start = Utc::now() - Duration::days(days as i64);
    generate_with_rng(&mut rand::thread_rng(), days, initial_price, start)
}

/// Same as [`generate_synthetic_bars`] but reproducible for a given seed
pub fn generate_synthetic_bars_seeded(days: usize, initial_price: f64, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_with_rng(&mut rng, days, initial_price, fixture_start())
}

fn generate_with_rng<R: Rng>(
    rng: &mut R,
    days: usize,
    initial_price: f64,
    start: DateTime<Utc>,
) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(days);
    let mut price = initial_price;

    let daily_volatility = 0.02;
    let drift = 0.0003;

    for i in 0..days {
        let date = start + Duration::days(i as i64);

        let random_return: f64 = rng.gen_range(-1.0..1.0);
        let daily_return = drift + daily_volatility * random_return;
        let new_price = (price * (1.0 + daily_return)).max(0.01);

        // Generate OHLC
        let intraday_range = price * rng.gen_range(0.005..0.03);
        let open = price + rng.gen_range(-intraday_range / 2.0..intraday_range / 2.0);
        let close = new_price;
        let high = open.max(close) + rng.gen_range(0.0..intraday_range / 2.0);
        let low = (open.min(close) - rng.gen_range(0.0..intraday_range / 2.0)).max(0.01);

        // Higher volume on volatile days
        let volume_multiplier = 1.0 + daily_return.abs() * 10.0;
        let volume = (5_000_000.0 * volume_multiplier * rng.gen_range(0.8..1.2)).round();

        bars.push(Bar {
            timestamp: date,
            open: to_price(open),
            high: to_price(high),
            low: to_price(low),
            close: to_price(close),
            volume: to_price(volume),
        });

        price = new_price;
    }

    bars
}

/// Daily bars whose closes follow `closes` exactly
///
/// Each bar opens at the previous close, spans open..close, and trades a
/// constant volume.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = fixture_start();
    let mut prev = closes.first().copied().unwrap_or_default();

    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            Bar {
                timestamp: start + Duration::days(i as i64),
                open: to_price(open),
                high: to_price(open.max(close)),
                low: to_price(open.min(close)),
                close: to_price(close),
                volume: Decimal::from(1_000_000),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_generate_synthetic_bars() {
        let bars = generate_synthetic_bars(100, 50.0);

        assert_eq!(bars.len(), 100);

        for bar in &bars {
            assert!(bar.high >= bar.low);
            assert!(bar.high >= bar.open);
            assert!(bar.high >= bar.close);
            assert!(bar.low <= bar.open);
            assert!(bar.low <= bar.close);
            assert!(bar.volume > Decimal::ZERO);
        }
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_seeded_bars_are_reproducible() {
        let a = generate_synthetic_bars_seeded(50, 100.0, 7);
        let b = generate_synthetic_bars_seeded(50, 100.0, 7);
        let c = generate_synthetic_bars_seeded(50, 100.0, 8);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_bars_from_closes() {
        let bars = bars_from_closes(&[10.0, 11.0, 9.0]);

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].open, dec!(10));
        assert_eq!(bars[1].open, dec!(10));
        assert_eq!(bars[1].high, dec!(11));
        assert_eq!(bars[2].low, dec!(9));
        assert_eq!(bars[2].close, dec!(9));
    }

    #[test]
    fn test_fixtures_start_on_first_day_of_2020() {
        let bars = bars_from_closes(&[10.0, 11.0]);

        assert_eq!(
            bars[0].timestamp,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            bars[1].timestamp,
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap()
        );
    }
}
