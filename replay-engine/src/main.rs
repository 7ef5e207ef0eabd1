use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use replay_engine::{
    generate_synthetic_bars, generate_synthetic_bars_seeded, load_file, BacktestConfig,
    BarSeries, BatchReport, BatchRunner, StrategyKind,
};

#[derive(Parser, Debug)]
#[command(name = "replay-engine")]
#[command(version = "0.1.0")]
#[command(about = "Replay price history bar-by-bar against trading signals", long_about = None)]
struct Args {
    /// Data file path (CSV/JSON). If not provided, uses synthetic data.
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// Number of days of synthetic data
    #[arg(short, long, default_value = "250")]
    days: usize,

    /// Initial price for synthetic data
    #[arg(long, default_value = "100.0")]
    initial_price: f64,

    /// Seed for reproducible synthetic data
    #[arg(long)]
    seed: Option<u64>,

    /// Backtest config file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial cash
    #[arg(long)]
    capital: Option<Decimal>,

    /// Transaction cost rate (reserved, not charged)
    #[arg(long)]
    transaction_cost: Option<Decimal>,

    /// Buy order notional
    #[arg(long)]
    order_notional: Option<Decimal>,

    /// Extra cost rate charged on buys and sells (0.001 = 0.1%)
    #[arg(long)]
    extra_cost: Option<Decimal>,

    /// Liquidate when equity falls below this fraction of the previous step
    #[arg(long)]
    drawdown_stop: Option<Decimal>,

    /// Liquidate when equity rises above this fraction of the previous step
    #[arg(long)]
    runup_stop: Option<Decimal>,

    /// First bar offset to trade on
    #[arg(long)]
    warmup: Option<usize>,

    /// Strategy to run (repeatable). Runs every strategy when omitted.
    #[arg(short, long = "strategy")]
    strategies: Vec<String>,

    /// Output format (json, text)
    #[arg(short, long, default_value = "json")]
    output: String,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Print the per-step equity log of the best run (text output)
    #[arg(long)]
    show_log: bool,
}

impl Args {
    fn backtest_config(&self) -> Result<BacktestConfig> {
        let mut config = match &self.config {
            Some(path) => BacktestConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => BacktestConfig::default(),
        };

        if let Some(cash) = self.capital {
            config.initial_cash = cash;
        }
        if let Some(rate) = self.transaction_cost {
            config.transaction_cost_rate = rate;
        }
        if let Some(notional) = self.order_notional {
            config.order_notional = notional;
        }
        if let Some(rate) = self.extra_cost {
            config.extra_cost_rate = rate;
        }
        if let Some(fraction) = self.drawdown_stop {
            config.drawdown_stop_fraction = fraction;
        }
        if let Some(fraction) = self.runup_stop {
            config.runup_stop_fraction = fraction;
        }
        if let Some(offset) = self.warmup {
            config.warmup_offset = offset;
        }

        config.validate()?;
        Ok(config)
    }

    fn strategy_kinds(&self) -> Result<Vec<StrategyKind>> {
        if self.strategies.is_empty() {
            return Ok(StrategyKind::all());
        }
        self.strategies
            .iter()
            .map(|name| name.parse::<StrategyKind>().map_err(Into::into))
            .collect()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("replay_engine=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.backtest_config()?;
    let kinds = args.strategy_kinds()?;

    // Load or generate data
    let series = if let Some(path) = &args.data_file {
        info!(path = %path.display(), "Loading data");
        load_file(path).with_context(|| format!("Failed to load {:?}", path))?
    } else {
        info!(
            days = args.days,
            initial_price = args.initial_price,
            seed = ?args.seed,
            "Generating synthetic data"
        );
        let bars = match args.seed {
            Some(seed) => generate_synthetic_bars_seeded(args.days, args.initial_price, seed),
            None => generate_synthetic_bars(args.days, args.initial_price),
        };
        BarSeries::new(bars)?
    };

    info!(
        bars = series.len(),
        strategies = kinds.len(),
        "Running backtests"
    );

    let runner = BatchRunner::new(config, Arc::new(series))?;
    let report = runner.run(&kinds);

    // Output result
    match args.output.as_str() {
        "json" => {
            let json = if args.pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
        }
        "text" => {
            print_text_report(&report, args.show_log);
        }
        _ => {
            warn!("Unknown output format: {}. Using text.", args.output);
            print_text_report(&report, args.show_log);
        }
    }

    Ok(())
}

fn print_text_report(report: &BatchReport, show_log: bool) {
    println!();
    println!("================================================================");
    println!("  BACKTEST REPORT - {} strategies", report.runs.len() + report.failures.len());
    println!("================================================================");
    println!();
    if let Some(run) = report.runs.first() {
        println!("  Period: {} to {}", run.start_date, run.end_date);
        println!("  Duration: {} trading days", run.records.len());
        println!("  Initial Cash:     ${:>12.2}", run.initial_cash);
    }
    println!(
        "  Buy & Hold:       {:>12.2}%",
        report.buy_and_hold_return_pct
    );
    println!();
    println!("----------------------------------------------------------------");
    println!("  RANKING (by total return)");
    println!("----------------------------------------------------------------");
    println!(
        "  {:<4}{:<22}{:>12}{:>10}{:>10}{:>9}{:>6}{:>6}",
        "#", "Strategy", "Final", "Return%", "Vol%", "Sharpe", "Buys", "Sells"
    );
    for (rank, run) in report.runs.iter().enumerate() {
        let r = &run.report;
        println!(
            "  {:<4}{:<22}{:>12.2}{:>+10.2}{:>10.2}{:>9.3}{:>6}{:>6}{}",
            rank + 1,
            run.name,
            r.final_equity,
            r.total_return_pct,
            r.annualized_volatility_pct,
            r.sharpe_ratio,
            r.buy_count,
            r.sell_count,
            if run.bankrupt { "  BANKRUPT" } else { "" }
        );
    }

    if !report.failures.is_empty() {
        println!();
        println!("----------------------------------------------------------------");
        println!("  FAILED");
        println!("----------------------------------------------------------------");
        for failure in &report.failures {
            println!("  {:<22}{}", failure.name, failure.error);
        }
    }

    if let Some(best) = report.runs.first() {
        let r = &best.report;
        println!();
        println!("----------------------------------------------------------------");
        println!("  BEST: {}", best.name);
        println!("----------------------------------------------------------------");
        println!("  Final Equity:     ${:>12.2}", best.final_equity);
        println!(
            "  Profit:           ${:>12.2} ({:+.2}%)",
            r.profit, r.total_return_pct
        );
        println!("  Return (Ann):     {:>12.2}%", r.annualized_return_pct);
        println!("  Volatility (Ann): {:>12.2}%", r.annualized_volatility_pct);
        println!("  Sharpe Ratio:     {:>12.3}", r.sharpe_ratio);
        println!("  Max Drawdown:     {:>12.2}%", r.max_drawdown_pct);
        println!("  Execution Time:   {:>12}ms", best.execution_time_ms);

        if show_log {
            println!();
            println!("  EQUITY LOG");
            println!("----------------------------------------------------------------");
            for record in &best.records {
                println!(
                    "  {} {:<8}{:>12.4}{:>14.4}{:>14.2}{:>14.2}",
                    record.timestamp.format("%Y-%m-%d"),
                    record.action,
                    record.price,
                    record.position_qty,
                    record.cash,
                    record.equity
                );
            }
        }
    }
    println!();
    println!("================================================================");
}
