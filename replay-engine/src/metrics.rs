use chrono::{DateTime, Utc};
use common::{Action, EquityRecord, PerformanceReport};
use rust_decimal::prelude::ToPrimitive;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Statistics over an equity curve
///
/// Every function is a pure function of its input. Degenerate inputs
/// resolve to sentinels instead of errors: an empty or single-point curve
/// has no returns, a zero previous value contributes a 0.0 return, and a
/// zero volatility makes the Sharpe ratio NaN.
pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    /// Full report for one run's equity log
    ///
    /// The benchmark buys and holds over the prices recorded alongside the
    /// equity, so both cover the same date range.
    pub fn analyze(records: &[EquityRecord]) -> PerformanceReport {
        if records.is_empty() {
            return PerformanceReport::default();
        }

        let curve = Self::equity_values(records);
        let prices: Vec<f64> = records.iter().map(|r| to_f64(r.price)).collect();

        let first = curve.first().copied().unwrap_or_default();
        let final_equity = curve.last().copied().unwrap_or_default();

        let count = |action: Action| records.iter().filter(|r| r.action == action).count() as u32;

        PerformanceReport {
            final_equity,
            profit: final_equity - first,
            total_return_pct: Self::total_return(&curve) * 100.0,
            annualized_return_pct: Self::annualized_return(&curve) * 100.0,
            annualized_volatility_pct: Self::annualized_volatility(&curve) * 100.0,
            sharpe_ratio: Self::sharpe_ratio(&curve),
            max_drawdown_pct: Self::max_drawdown(&curve),
            buy_and_hold_return_pct: Self::buy_and_hold_return(&prices) * 100.0,
            buy_count: count(Action::Buy),
            sell_count: count(Action::Sell),
        }
    }

    pub fn equity_values(records: &[EquityRecord]) -> Vec<f64> {
        records.iter().map(|r| to_f64(r.equity)).collect()
    }

    /// Simple returns `curve[i] / curve[i - 1] - 1`, computed lazily
    ///
    /// Empty for curves shorter than two points. Call again to restart.
    pub fn daily_returns(curve: &[f64]) -> impl Iterator<Item = f64> + Clone + '_ {
        curve.windows(2).map(|w| {
            let (prev, curr) = (w[0], w[1]);
            if prev != 0.0 {
                curr / prev - 1.0
            } else {
                0.0
            }
        })
    }

    /// Mean daily return scaled to a year
    pub fn annualized_return(curve: &[f64]) -> f64 {
        mean(Self::daily_returns(curve)).unwrap_or(0.0) * TRADING_DAYS_PER_YEAR
    }

    /// Sample standard deviation of daily returns scaled to a year
    pub fn annualized_volatility(curve: &[f64]) -> f64 {
        sample_std_dev(Self::daily_returns(curve)).unwrap_or(0.0) * TRADING_DAYS_PER_YEAR.sqrt()
    }

    /// NaN when volatility is zero
    pub fn sharpe_ratio(curve: &[f64]) -> f64 {
        let volatility = Self::annualized_volatility(curve);
        if volatility == 0.0 {
            return f64::NAN;
        }
        Self::annualized_return(curve) / volatility
    }

    pub fn total_return(curve: &[f64]) -> f64 {
        match (curve.first(), curve.last()) {
            (Some(&first), Some(&last)) if first != 0.0 => last / first - 1.0,
            _ => 0.0,
        }
    }

    /// Value of `initial_cash` fully invested at the first price
    pub fn buy_and_hold(prices: &[f64], initial_cash: f64) -> Vec<f64> {
        match prices.first() {
            Some(&p0) if p0 != 0.0 => {
                let units = initial_cash / p0;
                prices.iter().map(|p| p * units).collect()
            }
            _ => vec![0.0; prices.len()],
        }
    }

    pub fn buy_and_hold_return(prices: &[f64]) -> f64 {
        Self::total_return(prices)
    }

    /// Largest peak-to-trough decline, in percent
    pub fn max_drawdown(curve: &[f64]) -> f64 {
        Self::drawdowns(curve).fold(0.0, f64::max)
    }

    /// Percent below the running peak at each record
    pub fn drawdown_curve(records: &[EquityRecord]) -> Vec<(DateTime<Utc>, f64)> {
        let curve = Self::equity_values(records);
        records
            .iter()
            .zip(Self::drawdowns(&curve))
            .map(|(r, dd)| (r.timestamp, dd))
            .collect()
    }

    fn drawdowns(curve: &[f64]) -> impl Iterator<Item = f64> + '_ {
        let mut peak = f64::NEG_INFINITY;
        curve.iter().map(move |&equity| {
            peak = peak.max(equity);
            if peak > 0.0 {
                (peak - equity) / peak * 100.0
            } else {
                0.0
            }
        })
    }
}

fn to_f64(value: rust_decimal::Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// ddof = 1; `None` with fewer than two values
fn sample_std_dev(values: impl Iterator<Item = f64> + Clone) -> Option<f64> {
    let n = values.clone().count();
    if n < 2 {
        return None;
    }
    let mean = mean(values.clone())?;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(variance.sqrt())
}
