//! File-backed ledger: JSON balance and positions, CSV trade history.
//!
//! Layout under the data directory:
//! - `paper_balance.json`   asset → quantity
//! - `paper_positions.json` symbol → `{amount, entry_price, sl, tp}`
//! - `trade_history.csv`    `id,time,symbol,side,amount,price,cost,pnl,type`
//!
//! Files are rewritten in place with no locking. Two processes sharing a directory
//! overwrite each other's balance and positions (last writer wins).

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::error::TradedeskError;
use crate::domain::position::{Balance, Positions, Trade};
use crate::ports::ledger_port::LedgerPort;

pub const BALANCE_FILE: &str = "paper_balance.json";
pub const POSITIONS_FILE: &str = "paper_positions.json";
pub const HISTORY_FILE: &str = "trade_history.csv";

pub struct JsonLedgerAdapter {
    data_dir: PathBuf,
}

impl JsonLedgerAdapter {
    /// Open (creating if needed) a ledger directory.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, TradedeskError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, TradedeskError> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&path).map_err(|e| TradedeskError::persistence(name, e))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| TradedeskError::persistence(name, e))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), TradedeskError> {
        let content =
            serde_json::to_string_pretty(value).map_err(|e| TradedeskError::persistence(name, e))?;
        fs::write(self.path(name), content).map_err(|e| TradedeskError::persistence(name, e))
    }
}

impl LedgerPort for JsonLedgerAdapter {
    fn load_balance(&self) -> Result<Option<Balance>, TradedeskError> {
        self.read_json(BALANCE_FILE)
    }

    fn save_balance(&self, balance: &Balance) -> Result<(), TradedeskError> {
        self.write_json(BALANCE_FILE, balance)
    }

    fn load_positions(&self) -> Result<Option<Positions>, TradedeskError> {
        self.read_json(POSITIONS_FILE)
    }

    fn save_positions(&self, positions: &Positions) -> Result<(), TradedeskError> {
        self.write_json(POSITIONS_FILE, positions)
    }

    fn append_trade(&self, trade: &Trade) -> Result<(), TradedeskError> {
        let path = self.path(HISTORY_FILE);
        let write_header = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TradedeskError::persistence(HISTORY_FILE, e))?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        wtr.serialize(trade)
            .map_err(|e| TradedeskError::persistence(HISTORY_FILE, e))?;
        wtr.flush()
            .map_err(|e| TradedeskError::persistence(HISTORY_FILE, e))
    }

    fn load_trades(&self) -> Result<Vec<Trade>, TradedeskError> {
        let path = self.path(HISTORY_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr =
            csv::Reader::from_path(&path).map_err(|e| TradedeskError::persistence(HISTORY_FILE, e))?;

        let mut trades = Vec::new();
        for result in rdr.deserialize() {
            let trade: Trade = result.map_err(|e| TradedeskError::Persistence {
                artifact: HISTORY_FILE.into(),
                reason: format!("CSV parse error: {e}"),
            })?;
            trades.push(trade);
        }
        Ok(trades)
    }
}
