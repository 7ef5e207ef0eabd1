use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use common::{
    BacktestConfig, BacktestError, BarSeries, BatchReport, Result, StrategyFailure, StrategyRun,
};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::engine::BacktestEngine;
use crate::metrics::PerformanceAnalyzer;
use crate::signals::StrategyKind;

/// Runs one independent backtest per strategy over a shared series
pub struct BatchRunner {
    config: BacktestConfig,
    series: Arc<BarSeries>,
}

impl BatchRunner {
    pub fn new(config: BacktestConfig, series: Arc<BarSeries>) -> Result<Self> {
        config.validate()?;
        if series.len() <= config.warmup_offset {
            return Err(BacktestError::InvalidParameter(format!(
                "Series of {} bars leaves nothing to trade after warm-up offset {}",
                series.len(),
                config.warmup_offset
            )));
        }
        Ok(Self { config, series })
    }

    /// Run every strategy on the rayon pool and rank the results
    ///
    /// A failed run lands in `failures` and never affects its siblings.
    pub fn run(&self, kinds: &[StrategyKind]) -> BatchReport {
        let results: Mutex<Vec<std::result::Result<StrategyRun, StrategyFailure>>> =
            Mutex::new(Vec::with_capacity(kinds.len()));

        kinds.par_iter().for_each(|kind| {
            let outcome = self.run_one(kind).map_err(|e| {
                warn!(strategy = kind.name(), error = %e, "Strategy run failed");
                StrategyFailure {
                    name: kind.name().to_string(),
                    error: e.to_string(),
                }
            });
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(outcome);
        });

        let results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        let (mut runs, mut failures): (Vec<_>, Vec<_>) = (Vec::new(), Vec::new());
        for outcome in results {
            match outcome {
                Ok(run) => runs.push(run),
                Err(failure) => failures.push(failure),
            }
        }

        runs.sort_by(|a, b| {
            b.report
                .total_return_pct
                .total_cmp(&a.report.total_return_pct)
                .then_with(|| a.name.cmp(&b.name))
        });
        failures.sort_by(|a, b| a.name.cmp(&b.name));

        info!(
            completed = runs.len(),
            failed = failures.len(),
            best = runs.first().map(|r| r.name.as_str()).unwrap_or("-"),
            "Batch complete"
        );

        BatchReport {
            runs,
            failures,
            buy_and_hold_return_pct: PerformanceAnalyzer::buy_and_hold_return(&self.series.closes())
                * 100.0,
        }
    }

    /// Full pass for a single strategy with a freshly built provider
    pub fn run_one(&self, kind: &StrategyKind) -> Result<StrategyRun> {
        let start_time = Instant::now();

        let provider = kind.build(Arc::clone(&self.series))?;
        let mut engine = BacktestEngine::new(provider, self.config.clone(), Arc::clone(&self.series))?;
        engine.run()?;

        let bankrupt = engine.is_bankrupt();
        let records = engine.into_equity_curve();
        let report = PerformanceAnalyzer::analyze(&records);

        let (start_date, end_date) = match (records.first(), records.last()) {
            (Some(first), Some(last)) => (first.timestamp.date_naive(), last.timestamp.date_naive()),
            _ => {
                let date = self.series.date_at(self.config.warmup_offset)?.date_naive();
                (date, date)
            }
        };

        Ok(StrategyRun {
            name: kind.name().to_string(),
            report,
            start_date,
            end_date,
            initial_cash: self.config.initial_cash,
            final_equity: records
                .last()
                .map(|r| r.equity)
                .unwrap_or(self.config.initial_cash),
            records,
            bankrupt,
            execution_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{bars_from_closes, generate_synthetic_bars_seeded};
    use rust_decimal_macros::dec;

    fn series(closes: &[f64]) -> Arc<BarSeries> {
        Arc::new(BarSeries::new(bars_from_closes(closes)).unwrap())
    }

    #[test]
    fn test_runs_every_strategy_and_ranks() {
        let bars = generate_synthetic_bars_seeded(120, 100.0, 42);
        let series = Arc::new(BarSeries::new(bars).unwrap());
        let runner = BatchRunner::new(BacktestConfig::default(), series).unwrap();

        let report = runner.run(&StrategyKind::all());

        assert_eq!(report.runs.len() + report.failures.len(), StrategyKind::all().len());
        assert!(report.failures.is_empty());
        assert!(report
            .runs
            .windows(2)
            .all(|w| w[0].report.total_return_pct >= w[1].report.total_return_pct));
        for run in &report.runs {
            assert_eq!(run.records.len(), 100);
            assert_eq!(run.initial_cash, dec!(1000));
        }
    }

    #[test]
    fn test_results_are_deterministic() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let runner = BatchRunner::new(BacktestConfig::default(), series(&closes)).unwrap();

        let a = runner.run(&StrategyKind::all());
        let b = runner.run(&StrategyKind::all());

        let names = |r: &BatchReport| r.runs.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
        for (x, y) in a.runs.iter().zip(&b.runs) {
            assert_eq!(x.final_equity, y.final_equity);
        }
    }

    #[test]
    fn test_failed_run_does_not_abort_siblings() {
        // A zero-length window is rejected when the provider is built
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let runner = BatchRunner::new(BacktestConfig::default(), series(&closes)).unwrap();

        let report = runner.run(&[
            StrategyKind::CloseMomentum,
            StrategyKind::SmaCross { fast: 0, slow: 20 },
        ]);

        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.runs[0].name, "close_momentum");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "sma_cross");
    }

    #[test]
    fn test_buy_and_hold_over_full_series() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let runner = BatchRunner::new(BacktestConfig::default(), series(&closes)).unwrap();
        let report = runner.run(&[StrategyKind::CloseMomentum]);

        assert!((report.buy_and_hold_return_pct - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_series_shorter_than_warmup_is_rejected() {
        let result = BatchRunner::new(BacktestConfig::default(), series(&[1.0, 2.0]));
        assert!(matches!(result, Err(BacktestError::InvalidParameter(_))));
    }
}
