/// Bollinger Bands at a single point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Calculate Bollinger Bands over a window of prices
///
/// # Arguments
/// * `window` - Closing prices, oldest first; the window length is the period
/// * `width` - Number of standard deviations (typically 2.0)
pub fn bollinger_bands(window: &[f64], width: f64) -> Option<BollingerBands> {
    let std = std_dev(window)?;
    let middle = window.iter().sum::<f64>() / window.len() as f64;

    Some(BollingerBands {
        upper: middle + std * width,
        middle,
        lower: middle - std * width,
    })
}

/// Population standard deviation of simple returns across a price window
pub fn returns_std_dev(prices: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = prices
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();
    std_dev(&returns)
}
