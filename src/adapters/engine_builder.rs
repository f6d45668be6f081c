//! Builds an [`ExecutionEngine`] and its ledger from an [`ExecutionConfig`].

use std::path::Path;

use crate::domain::error::TradedeskError;
use crate::domain::execution::{ExecutionConfig, ExecutionEngine, LedgerBackend};
use crate::domain::order::ExecutionMode;
use crate::domain::position_manager::PositionManager;
use crate::ports::confirm_port::ConfirmPort;
use crate::ports::ledger_port::LedgerPort;

use super::json_ledger_adapter::JsonLedgerAdapter;
use super::okx_adapter::OkxClient;

/// Open the ledger store named by `store` inside `data_dir`.
pub fn open_ledger(store: LedgerBackend, data_dir: &Path) -> Result<Box<dyn LedgerPort>, TradedeskError> {
    match store {
        LedgerBackend::Json => Ok(Box::new(JsonLedgerAdapter::open(data_dir)?)),
        #[cfg(feature = "sqlite")]
        LedgerBackend::Sqlite => {
            use super::sqlite_ledger_adapter::{LEDGER_DB_FILE, SqliteLedgerAdapter};
            std::fs::create_dir_all(data_dir)?;
            Ok(Box::new(SqliteLedgerAdapter::open(data_dir.join(LEDGER_DB_FILE))?))
        }
        #[cfg(not(feature = "sqlite"))]
        LedgerBackend::Sqlite => Err(TradedeskError::ConfigInvalid {
            section: "execution".into(),
            key: "store".into(),
            reason: "built without the sqlite feature".into(),
        }),
    }
}

impl ExecutionEngine {
    /// Mock mode opens the configured ledger. Sandbox and live need a complete
    /// credential set and fail here, before any client exists, when one is missing.
    pub fn from_config(
        config: &ExecutionConfig,
        confirm: Box<dyn ConfirmPort>,
    ) -> Result<Self, TradedeskError> {
        match config.mode {
            ExecutionMode::Mock => {
                let ledger = open_ledger(config.store, &config.data_dir)?;
                Ok(ExecutionEngine::mock(PositionManager::new(ledger), config.default_price))
            }
            mode => {
                let credentials = config.api.credentials(mode)?;
                let client = OkxClient::new(
                    credentials,
                    &config.api.base_url,
                    mode == ExecutionMode::Sandbox,
                )?;
                ExecutionEngine::networked(mode, Box::new(client), confirm)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::ApiSettings;
    use crate::domain::order::{OrderRequest, OrderSide};
    use crate::ports::confirm_port::DenyAll;
    use tempfile::TempDir;

    fn config(mode: ExecutionMode, dir: &Path) -> ExecutionConfig {
        ExecutionConfig {
            mode,
            data_dir: dir.to_path_buf(),
            ..ExecutionConfig::default()
        }
    }

    #[test]
    fn mock_engine_uses_json_ledger_in_data_dir() {
        let dir = TempDir::new().unwrap();
        let mut engine =
            ExecutionEngine::from_config(&config(ExecutionMode::Mock, dir.path()), Box::new(DenyAll))
                .unwrap();
        assert_eq!(engine.mode(), ExecutionMode::Mock);

        let result = engine.place_order(&OrderRequest::market("BTC/USDT", OrderSide::Buy, 0.1));
        assert!(result.is_filled());
        assert!(dir.path().join("paper_balance.json").exists());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_store_creates_database() {
        let dir = TempDir::new().unwrap();
        let cfg = ExecutionConfig {
            store: LedgerBackend::Sqlite,
            ..config(ExecutionMode::Mock, &dir.path().join("nested"))
        };
        ExecutionEngine::from_config(&cfg, Box::new(DenyAll)).unwrap();
        assert!(dir.path().join("nested").join("ledger.sqlite3").exists());
    }

    #[test]
    fn networked_modes_need_credentials() {
        let dir = TempDir::new().unwrap();
        for mode in [ExecutionMode::Sandbox, ExecutionMode::Live] {
            let err = ExecutionEngine::from_config(&config(mode, dir.path()), Box::new(DenyAll))
                .err()
                .unwrap();
            assert!(matches!(err, TradedeskError::MissingCredentials { .. }));
        }
    }

    #[test]
    fn sandbox_with_credentials_builds_without_network() {
        let dir = TempDir::new().unwrap();
        let cfg = ExecutionConfig {
            api: ApiSettings {
                api_key: Some("k".into()),
                secret_key: Some("s".into()),
                passphrase: Some("p".into()),
                base_url: "http://127.0.0.1:9".into(),
            },
            ..config(ExecutionMode::Sandbox, dir.path())
        };
        let engine = ExecutionEngine::from_config(&cfg, Box::new(DenyAll)).unwrap();
        assert_eq!(engine.mode(), ExecutionMode::Sandbox);
    }
}
