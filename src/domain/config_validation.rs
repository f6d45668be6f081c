//! Configuration validation.
//!
//! Range checks run before any backtest or order; missing keys fall back to the
//! same defaults the config builders use.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::TradedeskError;
use crate::domain::execution::{DEFAULT_REFERENCE_PRICE, LedgerBackend};
use crate::domain::order::ExecutionMode;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TradedeskError> {
    let defaults = BacktestConfig::default();
    validate_backtest_values(&BacktestConfig {
        initial_capital: config.get_double("backtest", "initial_capital", defaults.initial_capital),
        commission: config.get_double("backtest", "commission", defaults.commission),
        risk_free_rate: config.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
    })
}

pub fn validate_execution_config(config: &dyn ConfigPort) -> Result<(), TradedeskError> {
    validate_mode(config)?;
    validate_store(config)?;
    validate_default_price(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> TradedeskError {
    TradedeskError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Range checks on an assembled backtest config, including command-line overrides.
pub fn validate_backtest_values(config: &BacktestConfig) -> Result<(), TradedeskError> {
    if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
        return Err(invalid("backtest", "initial_capital", "initial_capital must be positive"));
    }
    if !(0.0..1.0).contains(&config.commission) {
        return Err(invalid("backtest", "commission", "commission must be in [0, 1)"));
    }
    if !(0.0..1.0).contains(&config.risk_free_rate) {
        return Err(invalid("backtest", "risk_free_rate", "risk_free_rate must be between 0 and 1"));
    }
    Ok(())
}

fn validate_mode(config: &dyn ConfigPort) -> Result<(), TradedeskError> {
    match config.get_string("execution", "mode") {
        Some(s) => s.parse::<ExecutionMode>().map(|_| ()),
        None => Ok(()),
    }
}

fn validate_store(config: &dyn ConfigPort) -> Result<(), TradedeskError> {
    match config.get_string("execution", "store") {
        Some(s) => s.parse::<LedgerBackend>().map(|_| ()),
        None => Ok(()),
    }
}

fn validate_default_price(config: &dyn ConfigPort) -> Result<(), TradedeskError> {
    let value = config.get_double("execution", "default_price", DEFAULT_REFERENCE_PRICE);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid("execution", "default_price", "default_price must be positive"));
    }
    Ok(())
}
