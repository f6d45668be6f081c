//! Durable ledger storage port trait.
//!
//! Balance, positions and trade history are three independent artifacts. Nothing here
//! spans more than one of them, so a crash between two saves can leave them out of
//! step; adapters with transactions still commit each call on its own.

use crate::domain::error::TradedeskError;
use crate::domain::position::{Balance, Positions, Trade};

pub trait LedgerPort {
    /// `Ok(None)` when nothing has been stored yet.
    fn load_balance(&self) -> Result<Option<Balance>, TradedeskError>;

    fn save_balance(&self, balance: &Balance) -> Result<(), TradedeskError>;

    /// `Ok(None)` when nothing has been stored yet.
    fn load_positions(&self) -> Result<Option<Positions>, TradedeskError>;

    fn save_positions(&self, positions: &Positions) -> Result<(), TradedeskError>;

    fn append_trade(&self, trade: &Trade) -> Result<(), TradedeskError>;

    /// All trades in append order; empty when the log does not exist.
    fn load_trades(&self) -> Result<Vec<Trade>, TradedeskError>;
}
