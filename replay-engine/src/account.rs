use common::{BacktestError, Result};
use rust_decimal::Decimal;

/// Single-asset cash account driven by the engine
///
/// Holds cash and a long position quantity. Only the engine mutates it,
/// and a sale always closes the whole position.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    initial_cash: Decimal,
    cash: Decimal,
    position_qty: Decimal,
}

impl Account {
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            position_qty: Decimal::ZERO,
        }
    }

    pub fn initial_cash(&self) -> Decimal {
        self.initial_cash
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn position_qty(&self) -> Decimal {
        self.position_qty
    }

    pub fn has_position(&self) -> bool {
        self.position_qty > Decimal::ZERO
    }

    /// Cash plus the position marked at `price`
    pub fn equity(&self, price: Decimal) -> Decimal {
        self.cash + self.position_qty * price
    }

    pub fn is_bankrupt(&self) -> bool {
        self.cash <= Decimal::ZERO
    }

    /// Spend `notional` plus the extra cost on units at `price`
    ///
    /// Returns `false` without touching the account when cash does not
    /// strictly exceed the all-in cost.
    pub fn buy(&mut self, notional: Decimal, extra_cost_rate: Decimal, price: Decimal) -> bool {
        let cost = notional + extra_cost_rate * notional;
        if self.cash <= cost || price <= Decimal::ZERO {
            return false;
        }
        self.cash -= notional * (Decimal::ONE + extra_cost_rate);
        self.position_qty += notional / price;
        true
    }

    /// Sell the whole position at `price` less the extra cost
    ///
    /// Returns the proceeds credited to cash.
    pub fn liquidate(&mut self, extra_cost_rate: Decimal, price: Decimal) -> Decimal {
        let proceeds = self.position_qty * price * (Decimal::ONE - extra_cost_rate);
        self.cash += proceeds;
        self.position_qty = Decimal::ZERO;
        proceeds
    }
}

/// Buy notional that shrinks one currency unit at a time while unaffordable
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSizePolicy {
    initial_notional: Decimal,
    current_notional: Decimal,
}

impl OrderSizePolicy {
    pub fn new(initial_notional: Decimal) -> Self {
        Self {
            initial_notional,
            current_notional: initial_notional,
        }
    }

    pub fn initial_notional(&self) -> Decimal {
        self.initial_notional
    }

    pub fn current_notional(&self) -> Decimal {
        self.current_notional
    }

    /// Rebase against the cash on hand before a step trades
    ///
    /// Resets to the initial notional once cash covers it. Otherwise walks
    /// the current notional down by one unit until `cash` covers it plus
    /// the extra cost. The walk stops at zero; if zero is still not
    /// affordable the account is beyond rescue.
    pub fn rebase(&mut self, cash: Decimal, extra_cost_rate: Decimal) -> Result<Decimal> {
        if cash >= self.initial_notional {
            self.current_notional = self.initial_notional;
            return Ok(self.current_notional);
        }

        let multiplier = Decimal::ONE + extra_cost_rate;
        while cash < self.current_notional * multiplier {
            if self.current_notional <= Decimal::ZERO {
                return Err(BacktestError::OrderSizeExhausted {
                    cash,
                    notional: self.initial_notional,
                });
            }
            self.current_notional = (self.current_notional - Decimal::ONE).max(Decimal::ZERO);
        }

        Ok(self.current_notional)
    }
}
