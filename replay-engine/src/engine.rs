use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Action, BacktestConfig, BacktestError, BarSeries, EquityRecord, Result};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::account::{Account, OrderSizePolicy};
use crate::signals::SignalProvider;

/// Bar-by-bar replay of one signal provider against one account
///
/// Each [`step`](Self::step) trades at most one buy and one sell at the
/// bar's value in the provider's signal field, then applies the single-step stop against the previous
/// record's equity and appends exactly one [`EquityRecord`].
pub struct BacktestEngine<P: SignalProvider> {
    provider: P,
    config: BacktestConfig,
    series: Arc<BarSeries>,
    account: Account,
    order_size: OrderSizePolicy,
    records: Vec<EquityRecord>,
}

impl<P: SignalProvider> BacktestEngine<P> {
    pub fn new(provider: P, config: BacktestConfig, series: Arc<BarSeries>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            account: Account::new(config.initial_cash),
            order_size: OrderSizePolicy::new(config.order_notional),
            records: Vec::with_capacity(series.len().saturating_sub(config.warmup_offset)),
            provider,
            config,
            series,
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Buy notional after the most recent rebase
    pub fn order_notional(&self) -> Decimal {
        self.order_size.current_notional()
    }

    pub fn is_bankrupt(&self) -> bool {
        self.account.is_bankrupt()
    }

    pub fn equity_curve(&self) -> &[EquityRecord] {
        &self.records
    }

    pub fn into_equity_curve(self) -> Vec<EquityRecord> {
        self.records
    }

    /// Advance the simulation by the bar at `date`
    pub fn step(&mut self, date: DateTime<Utc>) -> Result<&EquityRecord> {
        let index = self.series.offset_of(date)?;
        if index < self.config.warmup_offset {
            return Err(BacktestError::BeforeWarmup {
                index,
                warmup: self.config.warmup_offset,
            });
        }
        let price = self.series.value(index, self.provider.signal_field())?;
        let extra_cost_rate = self.config.extra_cost_rate;
        let mut action = Action::Nothing;

        let notional = self
            .order_size
            .rebase(self.account.cash(), extra_cost_rate)?;

        self.provider.set_date(date).map_err(|e| self.fault(e))?;

        let wants_buy = self.provider.buy().map_err(|e| self.fault(e))?;
        if wants_buy && self.account.buy(notional, extra_cost_rate, price) {
            action = Action::Buy;
            debug!(
                provider = self.provider.name(),
                %date,
                %notional,
                %price,
                qty = %self.account.position_qty(),
                "Buy"
            );
        }

        let wants_sell = self.provider.sell().map_err(|e| self.fault(e))?;
        if wants_sell && self.account.has_position() {
            let proceeds = self.account.liquidate(extra_cost_rate, price);
            action = Action::Sell;
            debug!(provider = self.provider.name(), %date, %price, %proceeds, "Sell");
        }

        if let Some(previous) = self.records.last().map(|r| r.equity) {
            let equity_now = self.account.equity(price);
            let floor = (Decimal::ONE - self.config.drawdown_stop_fraction) * previous;
            let ceiling = (Decimal::ONE + self.config.runup_stop_fraction) * previous;

            if equity_now < floor || equity_now > ceiling {
                let proceeds = self.account.liquidate(extra_cost_rate, price);
                action = Action::Sell;
                debug!(
                    provider = self.provider.name(),
                    %date,
                    %previous,
                    %equity_now,
                    %proceeds,
                    "Stop triggered, position liquidated"
                );
            }
        }

        self.records.push(EquityRecord {
            timestamp: date,
            action,
            price,
            position_qty: self.account.position_qty(),
            cash: self.account.cash(),
            equity: self.account.equity(price),
        });

        // Just pushed
        Ok(&self.records[self.records.len() - 1])
    }

    /// Step every bar from the warm-up offset to the end of the series,
    /// stopping early once the account is bankrupt
    pub fn run(&mut self) -> Result<()> {
        let series = Arc::clone(&self.series);
        let warmup = self.config.warmup_offset;

        info!(
            provider = self.provider.name(),
            bars = series.len().saturating_sub(warmup),
            initial_cash = %self.config.initial_cash,
            "Starting backtest"
        );

        for bar in series.bars().iter().skip(warmup) {
            if self.is_bankrupt() {
                warn!(
                    provider = self.provider.name(),
                    date = %bar.timestamp,
                    cash = %self.account.cash(),
                    "Account bankrupt, stopping run"
                );
                break;
            }
            self.step(bar.timestamp)?;
        }

        info!(
            provider = self.provider.name(),
            steps = self.records.len(),
            final_equity = %self.records.last().map(|r| r.equity).unwrap_or(self.config.initial_cash),
            "Backtest complete"
        );
        Ok(())
    }

    fn fault(&self, err: BacktestError) -> BacktestError {
        match err {
            BacktestError::ProviderFault { .. } => err,
            other => BacktestError::ProviderFault {
                provider: self.provider.name().to_string(),
                reason: other.to_string(),
            },
        }
    }
}
