use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};

/// Backtest parameters, fixed for the lifetime of one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    // Account
    pub initial_cash: Decimal,
    /// Reserved; execution charges `extra_cost_rate` only
    pub transaction_cost_rate: Decimal,
    // Order sizing
    pub order_notional: Decimal,
    pub extra_cost_rate: Decimal,
    // Risk controls, compared against the previous recorded equity
    pub drawdown_stop_fraction: Decimal,
    pub runup_stop_fraction: Decimal,
    // First series offset the engine will trade on
    pub warmup_offset: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: Decimal::from(1000),
            transaction_cost_rate: Decimal::ZERO,
            order_notional: Decimal::from(900),
            extra_cost_rate: Decimal::ZERO,
            drawdown_stop_fraction: Decimal::new(2, 2),
            runup_stop_fraction: Decimal::new(50, 2),
            warmup_offset: 20,
        }
    }
}

impl BacktestConfig {
    pub fn with_capital(mut self, cash: Decimal) -> Self {
        self.initial_cash = cash;
        self
    }

    pub fn with_order_notional(mut self, notional: Decimal) -> Self {
        self.order_notional = notional;
        self
    }

    pub fn with_extra_cost(mut self, rate: Decimal) -> Self {
        self.extra_cost_rate = rate;
        self
    }

    pub fn with_stops(mut self, drawdown: Decimal, runup: Decimal) -> Self {
        self.drawdown_stop_fraction = drawdown;
        self.runup_stop_fraction = runup;
        self
    }

    pub fn with_warmup(mut self, offset: usize) -> Self {
        self.warmup_offset = offset;
        self
    }

    /// Reject parameter combinations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.initial_cash < Decimal::ZERO {
            return Err(BacktestError::InvalidParameter(format!(
                "initial_cash must be non-negative, got {}",
                self.initial_cash
            )));
        }
        if self.order_notional < Decimal::ZERO {
            return Err(BacktestError::InvalidParameter(format!(
                "order_notional must be non-negative, got {}",
                self.order_notional
            )));
        }
        if self.extra_cost_rate <= Decimal::NEGATIVE_ONE {
            return Err(BacktestError::InvalidParameter(format!(
                "extra_cost_rate must be greater than -1, got {}",
                self.extra_cost_rate
            )));
        }
        if self.drawdown_stop_fraction < Decimal::ZERO || self.runup_stop_fraction < Decimal::ZERO {
            return Err(BacktestError::InvalidParameter(
                "stop fractions must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from a `.json` or `.toml` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config: Self = match ext.as_str() {
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)
                .map_err(|e| BacktestError::ConfigError(e.to_string()))?,
            _ => {
                return Err(BacktestError::ConfigError(format!(
                    "Unsupported config format: {}",
                    ext
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_batch() {
        let config = BacktestConfig::default();
        assert_eq!(config.initial_cash, dec!(1000));
        assert_eq!(config.order_notional, dec!(900));
        assert_eq!(config.drawdown_stop_fraction, dec!(0.02));
        assert_eq!(config.runup_stop_fraction, dec!(0.50));
        assert_eq!(config.warmup_offset, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = BacktestConfig::default()
            .with_capital(dec!(5000))
            .with_order_notional(dec!(1000))
            .with_stops(dec!(0.2), dec!(0.5))
            .with_warmup(0);
        assert_eq!(config.initial_cash, dec!(5000));
        assert_eq!(config.order_notional, dec!(1000));
        assert_eq!(config.drawdown_stop_fraction, dec!(0.2));
        assert_eq!(config.warmup_offset, 0);
    }

    #[test]
    fn test_validate_rejects_degenerate_cost() {
        let config = BacktestConfig::default().with_extra_cost(dec!(-1));
        assert!(matches!(
            config.validate(),
            Err(BacktestError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_from_toml_file_with_partial_fields() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "initial_cash = \"2500\"").unwrap();
        writeln!(file, "warmup_offset = 5").unwrap();

        let config = BacktestConfig::from_file(file.path()).unwrap();
        assert_eq!(config.initial_cash, dec!(2500));
        assert_eq!(config.warmup_offset, 5);
        assert_eq!(config.order_notional, dec!(900));
    }

    #[test]
    fn test_from_json_file_is_validated() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"initial_cash": "-5"}}"#).unwrap();

        assert!(matches!(
            BacktestConfig::from_file(file.path()),
            Err(BacktestError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_from_file_unknown_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "initial_cash: 1000").unwrap();

        assert!(matches!(
            BacktestConfig::from_file(file.path()),
            Err(BacktestError::ConfigError(_))
        ));
    }
}
