//! Ledger records: positions, balances and the trade log.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::order::OrderSide;

/// Remaining amounts at or below this are treated as a closed position.
pub const DUST_THRESHOLD: f64 = 1e-6;

/// Asset symbol → available quantity.
pub type Balance = BTreeMap<String, f64>;

/// Instrument symbol → open position.
pub type Positions = BTreeMap<String, Position>;

pub fn default_balance() -> Balance {
    Balance::from([
        ("USDT".to_string(), 10_000.0),
        ("BTC".to_string(), 0.0),
        ("ETH".to_string(), 0.0),
    ])
}

/// An open long position. `entry_price` is the volume-weighted average cost of the
/// units currently held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub amount: f64,
    pub entry_price: f64,
    #[serde(rename = "sl", default)]
    pub stop_loss: Option<f64>,
    #[serde(rename = "tp", default)]
    pub take_profit: Option<f64>,
}

impl Position {
    pub fn new(amount: f64, entry_price: f64) -> Self {
        Position {
            amount,
            entry_price,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.amount * (price - self.entry_price)
    }

    pub fn is_dust(&self) -> bool {
        self.amount <= DUST_THRESHOLD
    }
}

/// A position as reported to callers, marked at `current_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionView {
    pub symbol: String,
    pub amount: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    pub pnl_pct: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl PositionView {
    pub fn marked(symbol: &str, position: &Position, current_price: f64) -> Self {
        let unrealized_pnl = position.unrealized_pnl(current_price);
        let cost = position.amount * position.entry_price;
        PositionView {
            symbol: symbol.to_string(),
            amount: position.amount,
            entry_price: position.entry_price,
            current_price,
            unrealized_pnl,
            pnl_pct: if cost > 0.0 { unrealized_pnl / cost } else { 0.0 },
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
        }
    }

    pub fn stop_loss_hit(&self) -> bool {
        self.stop_loss.is_some_and(|sl| self.current_price <= sl)
    }

    pub fn take_profit_hit(&self) -> bool {
        self.take_profit.is_some_and(|tp| self.current_price >= tp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Entry,
    Reduce,
    Close,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::Entry => write!(f, "entry"),
            TradeKind::Reduce => write!(f, "reduce"),
            TradeKind::Close => write!(f, "close"),
        }
    }
}

/// One row of the append-only trade log. Column order matches the on-disk history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub time: String,
    pub symbol: String,
    pub side: OrderSide,
    pub amount: f64,
    pub price: f64,
    pub cost: f64,
    /// Realized PnL; absent on entries.
    pub pnl: Option<f64>,
    #[serde(rename = "type")]
    pub kind: TradeKind,
}

impl Trade {
    pub fn new(
        symbol: &str,
        side: OrderSide,
        amount: f64,
        price: f64,
        pnl: Option<f64>,
        kind: TradeKind,
    ) -> Self {
        Trade {
            id: format!("trade_{}", uuid::Uuid::new_v4().simple()),
            time: chrono::Utc::now().to_rfc3339(),
            symbol: symbol.to_string(),
            side,
            amount,
            price,
            cost: amount * price,
            pnl,
            kind,
        }
    }
}
