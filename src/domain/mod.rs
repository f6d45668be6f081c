//! Core domain types and logic.

pub mod ohlcv;
pub mod signal;
pub mod order;
pub mod position;
pub mod position_manager;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
