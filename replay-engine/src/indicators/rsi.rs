/// Relative Strength Index from simple average gains and losses
///
/// # Arguments
/// * `closes` - `period + 1` closing prices, oldest first
///
/// # Returns
/// RSI in 0..=100, 100 when the window has no losses; `None` with fewer
/// than two prices
pub fn rsi(closes: &[f64]) -> Option<f64> {
    if closes.len() < 2 {
        return None;
    }
    let period = (closes.len() - 1) as f64;

    let (gains, losses) = closes.windows(2).fold((0.0, 0.0), |(g, l), w| {
        let change = w[1] - w[0];
        if change > 0.0 {
            (g + change, l)
        } else {
            (g, l - change)
        }
    });

    let avg_gain = gains / period;
    let avg_loss = losses / period;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}
