#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tradedesk::domain::error::TradedeskError;
use tradedesk::domain::order::OrderRequest;
use tradedesk::ports::confirm_port::ConfirmPort;
use tradedesk::ports::trading_api_port::{
    RemoteOrder, RemoteOrderState, RemotePosition, TradingApiPort,
};

/// Shared state behind [`MockTradingApi`]; the test keeps one handle, the engine the
/// other.
#[derive(Default)]
pub struct ApiState {
    pub calls: RefCell<Vec<String>>,
    pub balances: RefCell<HashMap<String, f64>>,
    pub positions: RefCell<Vec<RemotePosition>>,
    pub refreshed: RefCell<Option<RemoteOrder>>,
    pub fail_all: Cell<bool>,
    pub fail_refresh: Cell<bool>,
}

#[derive(Clone, Default)]
pub struct MockTradingApi {
    pub state: Rc<ApiState>,
}

impl MockTradingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, asset: &str, amount: f64) -> Self {
        self.state.balances.borrow_mut().insert(asset.to_string(), amount);
        self
    }

    pub fn with_position(self, position: RemotePosition) -> Self {
        self.state.positions.borrow_mut().push(position);
        self
    }

    /// The order query after submission reports a fill at `price`.
    pub fn filling_at(self, price: f64) -> Self {
        *self.state.refreshed.borrow_mut() = Some(RemoteOrder {
            order_id: "ord-1".into(),
            state: RemoteOrderState::Filled,
            avg_price: Some(price),
        });
        self
    }

    pub fn failing(self) -> Self {
        self.state.fail_all.set(true);
        self
    }

    pub fn failing_refresh(self) -> Self {
        self.state.fail_refresh.set(true);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.borrow().clone()
    }

    fn record(&self, call: String) -> Result<(), TradedeskError> {
        self.state.calls.borrow_mut().push(call);
        if self.state.fail_all.get() {
            return Err(TradedeskError::Network {
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }
}

impl TradingApiPort for MockTradingApi {
    fn fetch_balance(&self, asset: &str) -> Result<f64, TradedeskError> {
        self.record(format!("fetch_balance {asset}"))?;
        Ok(self.state.balances.borrow().get(asset).copied().unwrap_or(0.0))
    }

    fn create_order(&self, order: &OrderRequest) -> Result<RemoteOrder, TradedeskError> {
        self.record(format!("create_order {} {} {}", order.side, order.amount, order.symbol))?;
        Ok(RemoteOrder {
            order_id: "ord-1".into(),
            state: RemoteOrderState::Live,
            avg_price: None,
        })
    }

    fn fetch_order(&self, _symbol: &str, order_id: &str) -> Result<RemoteOrder, TradedeskError> {
        self.record(format!("fetch_order {order_id}"))?;
        if self.state.fail_refresh.get() {
            return Err(TradedeskError::Network {
                reason: "timeout".into(),
            });
        }
        Ok(self.state.refreshed.borrow().clone().unwrap_or(RemoteOrder {
            order_id: order_id.to_string(),
            state: RemoteOrderState::Live,
            avg_price: None,
        }))
    }

    fn fetch_positions(&self) -> Result<Vec<RemotePosition>, TradedeskError> {
        self.record("fetch_positions".into())?;
        Ok(self.state.positions.borrow().clone())
    }
}

/// Fixed-answer confirmation that counts how often it was asked.
#[derive(Clone)]
pub struct ScriptedConfirm {
    pub answer: bool,
    pub asked: Rc<Cell<usize>>,
}

impl ScriptedConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Rc::new(Cell::new(0)),
        }
    }
}

impl ConfirmPort for ScriptedConfirm {
    fn confirm(&self, _order: &OrderRequest) -> bool {
        self.asked.set(self.asked.get() + 1);
        self.answer
    }
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Daily close-only price CSV starting 2024-01-01.
pub fn price_csv(closes: &[f64]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for (i, c) in closes.iter().enumerate() {
        out.push_str(&format!("2024-01-{:02},{c},{c},{c},{c},1000\n", i + 1));
    }
    out
}

/// Daily signal CSV starting 2024-01-01.
pub fn signal_csv(signals: &[i32]) -> String {
    let mut out = String::from("date,signal\n");
    for (i, s) in signals.iter().enumerate() {
        out.push_str(&format!("2024-01-{:02},{s}\n", i + 1));
    }
    out
}
