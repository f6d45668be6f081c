//! Order requests, results and execution modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::TradedeskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl FromStr for OrderSide {
    type Err = TradedeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(TradedeskError::Validation {
                reason: format!("unknown order side '{other}'"),
            }),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

impl FromStr for OrderType {
    type Err = TradedeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            other => Err(TradedeskError::Validation {
                reason: format!("unknown order type '{other}'"),
            }),
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
        }
    }
}

/// Where orders go: the local paper ledger, the exchange sandbox, or the real account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Mock,
    Sandbox,
    Live,
}

impl ExecutionMode {
    pub fn is_networked(self) -> bool {
        !matches!(self, ExecutionMode::Mock)
    }
}

impl FromStr for ExecutionMode {
    type Err = TradedeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" | "paper" => Ok(ExecutionMode::Mock),
            "sandbox" | "testnet" => Ok(ExecutionMode::Sandbox),
            "live" => Ok(ExecutionMode::Live),
            other => Err(TradedeskError::ConfigInvalid {
                section: "execution".into(),
                key: "mode".into(),
                reason: format!("unknown mode '{other}' (expected mock, sandbox or live)"),
            }),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Mock => write!(f, "mock"),
            ExecutionMode::Sandbox => write!(f, "sandbox"),
            ExecutionMode::Live => write!(f, "live"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub amount: f64,
    pub order_type: OrderType,
    pub price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: OrderSide, amount: f64) -> Self {
        OrderRequest {
            symbol: symbol.to_string(),
            side,
            amount,
            order_type: OrderType::Market,
            price: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_stops(mut self, stop_loss: Option<f64>, take_profit: Option<f64>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// Split `BASE/QUOTE` into its assets.
    pub fn assets(&self) -> Result<(&str, &str), TradedeskError> {
        split_symbol(&self.symbol)
    }
}

pub fn split_symbol(symbol: &str) -> Result<(&str, &str), TradedeskError> {
    let mut parts = symbol.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
            Ok((base, quote))
        }
        _ => Err(TradedeskError::Validation {
            reason: format!("invalid symbol format '{symbol}' (expected BASE/QUOTE)"),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Executed in full.
    Filled,
    /// Failed local validation; no state touched.
    Rejected,
    /// Accepted by the exchange, fill not yet confirmed.
    Submitted,
    /// Submission or bookkeeping failed.
    Failed,
    /// Declined at the live confirmation step.
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Filled => "filled",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub status: OrderStatus,
    pub order_id: Option<String>,
    pub price: Option<f64>,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

impl OrderResult {
    pub fn filled(order_id: String, price: f64) -> Self {
        OrderResult {
            status: OrderStatus::Filled,
            order_id: Some(order_id),
            price: Some(price),
            reason: None,
            warnings: Vec::new(),
        }
    }

    pub fn submitted(order_id: String, price: Option<f64>) -> Self {
        OrderResult {
            status: OrderStatus::Submitted,
            order_id: Some(order_id),
            price,
            reason: None,
            warnings: Vec::new(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::without_order(OrderStatus::Rejected, reason.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::without_order(OrderStatus::Failed, reason.into())
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::without_order(OrderStatus::Cancelled, reason.into())
    }

    fn without_order(status: OrderStatus, reason: String) -> Self {
        OrderResult {
            status,
            order_id: None,
            price: None,
            reason: Some(reason),
            warnings: Vec::new(),
        }
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sides_and_types() {
        assert_eq!("BUY".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!(" sell ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("hold".parse::<OrderSide>().is_err());
        assert_eq!("limit".parse::<OrderType>().unwrap(), OrderType::Limit);
        assert_eq!(OrderType::default(), OrderType::Market);
    }

    #[test]
    fn parse_modes_with_aliases() {
        assert_eq!("mock".parse::<ExecutionMode>().unwrap(), ExecutionMode::Mock);
        assert_eq!("paper".parse::<ExecutionMode>().unwrap(), ExecutionMode::Mock);
        assert_eq!("testnet".parse::<ExecutionMode>().unwrap(), ExecutionMode::Sandbox);
        assert_eq!("LIVE".parse::<ExecutionMode>().unwrap(), ExecutionMode::Live);
        assert!(matches!(
            "demo".parse::<ExecutionMode>(),
            Err(TradedeskError::ConfigInvalid { .. })
        ));
        assert!(ExecutionMode::Live.is_networked());
        assert!(!ExecutionMode::Mock.is_networked());
    }

    #[test]
    fn split_symbol_valid() {
        assert_eq!(split_symbol("BTC/USDT").unwrap(), ("BTC", "USDT"));
    }

    #[test]
    fn split_symbol_malformed() {
        for bad in ["BTCUSDT", "BTC/", "/USDT", "BTC/USDT/X", ""] {
            assert!(
                matches!(split_symbol(bad), Err(TradedeskError::Validation { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn request_builders() {
        let req = OrderRequest::market("ETH/USDT", OrderSide::Buy, 2.0)
            .with_price(3_000.0)
            .with_stops(Some(2_800.0), None);
        assert_eq!(req.price, Some(3_000.0));
        assert_eq!(req.stop_loss, Some(2_800.0));
        assert_eq!(req.take_profit, None);
        assert_eq!(req.assets().unwrap(), ("ETH", "USDT"));
    }

    #[test]
    fn result_constructors() {
        let r = OrderResult::rejected("Insufficient funds");
        assert_eq!(r.status, OrderStatus::Rejected);
        assert_eq!(r.reason.as_deref(), Some("Insufficient funds"));
        assert!(!r.is_filled());
        assert!(OrderResult::filled("x".into(), 1.0).is_filled());
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
    }
}
