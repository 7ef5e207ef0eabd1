/// Exponential Moving Average over a window of prices
///
/// The window's first price seeds the average and the smoothing factor is
/// `2 / (n + 1)` for a window of `n` prices, so the value depends only on
/// the window itself.
pub fn ema(window: &[f64]) -> Option<f64> {
    let (&seed, rest) = window.split_first()?;
    let multiplier = 2.0 / (window.len() as f64 + 1.0);

    Some(
        rest.iter()
            .fold(seed, |ema, &price| price * multiplier + ema * (1.0 - multiplier)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ema_basic() {
        // alpha = 0.5: 10 -> 10.5 -> 11.25
        let value = ema(&[10.0, 11.0, 12.0]).unwrap();
        assert_relative_eq!(value, 11.25, epsilon = 1e-12);
    }

    #[test]
    fn test_ema_single_price() {
        assert_eq!(ema(&[42.0]), Some(42.0));
    }

    #[test]
    fn test_ema_lags_rising_prices() {
        let prices = [10.0, 11.0, 12.0, 13.0, 14.0];
        let value = ema(&prices).unwrap();
        assert!(value < 14.0);
        assert!(value > 10.0);
    }

    #[test]
    fn test_ema_empty() {
        assert_eq!(ema(&[]), None);
    }
}
