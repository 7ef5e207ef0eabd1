/// Simple Moving Average over a window of prices
///
/// # Arguments
/// * `window` - Prices, oldest first; the window length is the period
///
/// # Returns
/// `None` for an empty window
pub fn sma(window: &[f64]) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_basic() {
        assert_eq!(sma(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(sma(&[8.0, 9.0, 10.0]), Some(9.0));
    }

    #[test]
    fn test_sma_empty() {
        assert_eq!(sma(&[]), None);
    }
}
