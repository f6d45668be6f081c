//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod engine_builder;
pub mod file_config_adapter;
pub mod json_ledger_adapter;
pub mod okx_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_ledger_adapter;
pub mod stdin_confirm_adapter;
