//! SQLite ledger adapter.
//!
//! Balance and positions are JSON documents in a key/value table; trades are rows in
//! an append-only table ordered by insertion. Each call commits on its own.

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::error::TradedeskError;
use crate::domain::position::{Balance, Positions, Trade};
use crate::ports::ledger_port::LedgerPort;

pub const LEDGER_DB_FILE: &str = "ledger.sqlite3";

const BALANCE_KEY: &str = "balance";
const POSITIONS_KEY: &str = "positions";

pub struct SqliteLedgerAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(artifact: &str) -> impl Fn(rusqlite::Error) -> TradedeskError + '_ {
    move |e| TradedeskError::persistence(artifact, e)
}

impl SqliteLedgerAdapter {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, TradedeskError> {
        let manager = SqliteConnectionManager::file(db_path.as_ref());
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TradedeskError::persistence(LEDGER_DB_FILE, e))?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, TradedeskError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TradedeskError::persistence(":memory:", e))?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TradedeskError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| TradedeskError::persistence(LEDGER_DB_FILE, e))
    }

    pub fn initialize_schema(&self) -> Result<(), TradedeskError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS ledger_kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS trades (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL,
                    time TEXT NOT NULL,
                    symbol TEXT NOT NULL,
                    side TEXT NOT NULL,
                    amount REAL NOT NULL,
                    price REAL NOT NULL,
                    cost REAL NOT NULL,
                    pnl REAL,
                    type TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades(symbol);",
            )
            .map_err(db_err(LEDGER_DB_FILE))
    }

    fn get_doc<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, TradedeskError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM ledger_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err(key))?;

        raw.map(|s| serde_json::from_str(&s).map_err(|e| TradedeskError::persistence(key, e)))
            .transpose()
    }

    fn put_doc<T: Serialize>(&self, key: &str, value: &T) -> Result<(), TradedeskError> {
        let json = serde_json::to_string(value).map_err(|e| TradedeskError::persistence(key, e))?;
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err(key))?;
        tx.execute(
            "INSERT OR REPLACE INTO ledger_kv (key, value) VALUES (?1, ?2)",
            params![key, json],
        )
        .map_err(db_err(key))?;
        tx.commit().map_err(db_err(key))
    }
}

/// Serialize a unit enum through serde so the stored text matches the CSV/JSON spelling.
fn enum_text<T: Serialize>(value: &T) -> Result<String, TradedeskError> {
    match serde_json::to_value(value).map_err(|e| TradedeskError::persistence("trades", e))? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(TradedeskError::persistence("trades", format!("unexpected value {other}"))),
    }
}

fn enum_from_text<T: DeserializeOwned>(text: String) -> Result<T, TradedeskError> {
    serde_json::from_value(serde_json::Value::String(text))
        .map_err(|e| TradedeskError::persistence("trades", e))
}

impl LedgerPort for SqliteLedgerAdapter {
    fn load_balance(&self) -> Result<Option<Balance>, TradedeskError> {
        self.get_doc(BALANCE_KEY)
    }

    fn save_balance(&self, balance: &Balance) -> Result<(), TradedeskError> {
        self.put_doc(BALANCE_KEY, balance)
    }

    fn load_positions(&self) -> Result<Option<Positions>, TradedeskError> {
        self.get_doc(POSITIONS_KEY)
    }

    fn save_positions(&self, positions: &Positions) -> Result<(), TradedeskError> {
        self.put_doc(POSITIONS_KEY, positions)
    }

    fn append_trade(&self, trade: &Trade) -> Result<(), TradedeskError> {
        let side = enum_text(&trade.side)?;
        let kind = enum_text(&trade.kind)?;
        self.conn()?
            .execute(
                "INSERT INTO trades (id, time, symbol, side, amount, price, cost, pnl, type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    trade.id,
                    trade.time,
                    trade.symbol,
                    side,
                    trade.amount,
                    trade.price,
                    trade.cost,
                    trade.pnl,
                    kind
                ],
            )
            .map_err(db_err("trades"))?;
        Ok(())
    }

    fn load_trades(&self) -> Result<Vec<Trade>, TradedeskError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, time, symbol, side, amount, price, cost, pnl, type
                 FROM trades ORDER BY seq ASC",
            )
            .map_err(db_err("trades"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, Option<f64>>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })
            .map_err(db_err("trades"))?;

        let mut trades = Vec::new();
        for row in rows {
            let (id, time, symbol, side, amount, price, cost, pnl, kind) =
                row.map_err(db_err("trades"))?;
            trades.push(Trade {
                id,
                time,
                symbol,
                side: enum_from_text(side)?,
                amount,
                price,
                cost,
                pnl,
                kind: enum_from_text(kind)?,
            });
        }
        Ok(trades)
    }
}
