//! Remote exchange API port trait (sandbox and live execution).

use crate::domain::error::TradedeskError;
use crate::domain::order::OrderRequest;

/// Exchange acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOrder {
    pub order_id: String,
    pub state: RemoteOrderState,
    pub avg_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOrderState {
    Live,
    PartiallyFilled,
    Filled,
    Canceled,
    Unknown,
}

/// An open position as reported by the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePosition {
    pub symbol: String,
    pub amount: f64,
    pub entry_price: f64,
    pub mark_price: f64,
    pub unrealized_pnl: f64,
}

pub trait TradingApiPort {
    /// Free balance of one asset.
    fn fetch_balance(&self, asset: &str) -> Result<f64, TradedeskError>;

    fn create_order(&self, order: &OrderRequest) -> Result<RemoteOrder, TradedeskError>;

    fn fetch_order(&self, symbol: &str, order_id: &str) -> Result<RemoteOrder, TradedeskError>;

    fn fetch_positions(&self) -> Result<Vec<RemotePosition>, TradedeskError>;
}
