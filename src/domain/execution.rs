//! Order execution across paper, sandbox and live modes.
//!
//! [`ExecutionEngine`] is fixed to one mode when it is built. Mock orders are checked
//! against the paper balance and booked through the [`PositionManager`]; sandbox and
//! live orders go to a [`TradingApiPort`]. Live orders additionally need a yes from the
//! [`ConfirmPort`] before anything is sent.
//!
//! No error escapes `place_order`: rejections, exchange failures and ledger write
//! failures all come back as an [`OrderResult`] with the matching status.

use std::path::PathBuf;
use std::str::FromStr;

use crate::ports::confirm_port::ConfirmPort;
use crate::ports::trading_api_port::{RemoteOrder, RemoteOrderState, TradingApiPort};

use super::error::TradedeskError;
use super::order::{ExecutionMode, OrderRequest, OrderResult, OrderSide, OrderStatus, OrderType};
use super::position::{Balance, PositionView, Trade, TradeKind};
use super::position_manager::PositionManager;

/// Fill price for paper orders that arrive without one.
pub const DEFAULT_REFERENCE_PRICE: f64 = 50_000.0;

pub const OKX_BASE_URL: &str = "https://www.okx.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerBackend {
    #[default]
    Json,
    Sqlite,
}

impl FromStr for LedgerBackend {
    type Err = TradedeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LedgerBackend::Json),
            "sqlite" => Ok(LedgerBackend::Sqlite),
            other => Err(TradedeskError::ConfigInvalid {
                section: "execution".into(),
                key: "store".into(),
                reason: format!("unknown store '{other}' (expected json or sqlite)"),
            }),
        }
    }
}

/// Exchange API settings as read from config/environment; any field may be absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiSettings {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub passphrase: Option<String>,
    pub base_url: String,
}

/// A complete credential set. Only obtainable through [`ApiSettings::credentials`].
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .field("passphrase", &"***")
            .finish()
    }
}

impl ApiSettings {
    pub fn credentials(&self, mode: ExecutionMode) -> Result<Credentials, TradedeskError> {
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.trim().is_empty()).map(str::to_string);

        let fields = [
            ("api_key", present(&self.api_key)),
            ("secret_key", present(&self.secret_key)),
            ("passphrase", present(&self.passphrase)),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(TradedeskError::MissingCredentials {
                mode: mode.to_string(),
                missing: missing.join(", "),
            });
        }

        let [(_, api_key), (_, secret_key), (_, passphrase)] = fields;
        Ok(Credentials {
            api_key: api_key.unwrap_or_default(),
            secret_key: secret_key.unwrap_or_default(),
            passphrase: passphrase.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    pub data_dir: PathBuf,
    pub store: LedgerBackend,
    pub default_price: f64,
    pub api: ApiSettings,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            mode: ExecutionMode::Mock,
            data_dir: PathBuf::from("./data"),
            store: LedgerBackend::Json,
            default_price: DEFAULT_REFERENCE_PRICE,
            api: ApiSettings {
                base_url: OKX_BASE_URL.to_string(),
                ..ApiSettings::default()
            },
        }
    }
}

pub enum ExecutionEngine {
    Mock(MockExecutor),
    Sandbox(RemoteExecutor),
    Live {
        remote: RemoteExecutor,
        confirm: Box<dyn ConfirmPort>,
    },
}

impl ExecutionEngine {
    pub fn mock(pm: PositionManager, default_price: f64) -> Self {
        tracing::info!("initializing executor in MOCK mode");
        ExecutionEngine::Mock(MockExecutor::new(pm, default_price))
    }

    /// Engine backed by an exchange client. `confirm` is only consulted in live mode.
    pub fn networked(
        mode: ExecutionMode,
        api: Box<dyn TradingApiPort>,
        confirm: Box<dyn ConfirmPort>,
    ) -> Result<Self, TradedeskError> {
        tracing::info!(%mode, "initializing networked executor");
        let remote = RemoteExecutor { mode, api };
        match mode {
            ExecutionMode::Mock => Err(TradedeskError::ConfigInvalid {
                section: "execution".into(),
                key: "mode".into(),
                reason: "mock mode has no exchange client".into(),
            }),
            ExecutionMode::Sandbox => Ok(ExecutionEngine::Sandbox(remote)),
            ExecutionMode::Live => Ok(ExecutionEngine::Live { remote, confirm }),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        match self {
            ExecutionEngine::Mock(_) => ExecutionMode::Mock,
            ExecutionEngine::Sandbox(_) => ExecutionMode::Sandbox,
            ExecutionEngine::Live { .. } => ExecutionMode::Live,
        }
    }

    /// Available balance of `asset`. Exchange failures read as zero.
    pub fn get_balance(&self, asset: &str) -> f64 {
        match self {
            ExecutionEngine::Mock(mock) => mock.balance(asset),
            ExecutionEngine::Sandbox(remote) | ExecutionEngine::Live { remote, .. } => {
                remote.balance(asset)
            }
        }
    }

    pub fn place_order(&mut self, order: &OrderRequest) -> OrderResult {
        match self {
            ExecutionEngine::Mock(mock) => mock.place_order(order),
            ExecutionEngine::Sandbox(remote) => remote.submit(order),
            ExecutionEngine::Live { remote, confirm } => {
                if let Err(e) = validate(order) {
                    return reject(e);
                }
                if !confirm.confirm(order) {
                    tracing::warn!(symbol = %order.symbol, "live order declined at confirmation");
                    return OrderResult::cancelled("order cancelled by user safety check");
                }
                remote.submit(order)
            }
        }
    }

    pub fn get_positions(&self) -> Vec<PositionView> {
        match self {
            ExecutionEngine::Mock(mock) => mock.positions(),
            ExecutionEngine::Sandbox(remote) | ExecutionEngine::Live { remote, .. } => {
                remote.positions()
            }
        }
    }

    /// Local trade log in mock mode. Exchange history is not fetched, so networked
    /// modes return nothing.
    pub fn get_trade_history(&self) -> Vec<Trade> {
        match self {
            ExecutionEngine::Mock(mock) => mock.pm.get_history(),
            ExecutionEngine::Sandbox(_) | ExecutionEngine::Live { .. } => Vec::new(),
        }
    }
}

/// Paper trading against the local ledger.
pub struct MockExecutor {
    pm: PositionManager,
    balance: Balance,
    default_price: f64,
}

impl MockExecutor {
    pub fn new(pm: PositionManager, default_price: f64) -> Self {
        let balance = pm.get_balance();
        MockExecutor {
            pm,
            balance,
            default_price,
        }
    }

    fn balance(&self, asset: &str) -> f64 {
        self.balance.get(asset).copied().unwrap_or(0.0)
    }

    fn positions(&self) -> Vec<PositionView> {
        self.pm
            .get_positions()
            .iter()
            .map(|(symbol, pos)| PositionView::marked(symbol, pos, pos.entry_price))
            .collect()
    }

    fn place_order(&mut self, order: &OrderRequest) -> OrderResult {
        tracing::info!(
            side = %order.side,
            amount = order.amount,
            symbol = %order.symbol,
            "[MOCK] placing order"
        );

        let (base, quote) = match validate(order) {
            Ok(assets) => assets,
            Err(e) => return reject(e),
        };
        let price = order.price.unwrap_or(self.default_price);
        let cost = order.amount * price;

        let shortfall = match order.side {
            OrderSide::Buy => {
                let available = self.balance(quote);
                (available < cost).then(|| {
                    format!("insufficient funds: need {cost} {quote}, have {available}")
                })
            }
            OrderSide::Sell => {
                let held = self.balance(base);
                (held < order.amount).then(|| {
                    format!("insufficient holdings: need {} {base}, have {held}", order.amount)
                })
            }
        };
        if let Some(reason) = shortfall {
            return reject(TradedeskError::Validation { reason });
        }

        match self.fill(order, base, quote, price, cost) {
            Ok(id) => {
                tracing::info!(id = %id, price, cost, "[MOCK] order filled");
                OrderResult::filled(id, price)
            }
            Err(e) => {
                tracing::error!(error = %e, "[MOCK] ledger write failed during fill");
                OrderResult::failed(e.to_string())
            }
        }
    }

    fn fill(
        &mut self,
        order: &OrderRequest,
        base: &str,
        quote: &str,
        price: f64,
        cost: f64,
    ) -> Result<String, TradedeskError> {
        let mut next = self.balance.clone();
        let (debit, debit_qty, credit, credit_qty) = match order.side {
            OrderSide::Buy => (quote, cost, base, order.amount),
            OrderSide::Sell => (base, order.amount, quote, cost),
        };
        *next.entry(debit.to_string()).or_insert(0.0) -= debit_qty;
        *next.entry(credit.to_string()).or_insert(0.0) += credit_qty;

        self.pm.save_balance(&next)?;
        self.balance = next;

        match order.side {
            OrderSide::Buy => {
                self.pm.update_position(
                    &order.symbol,
                    OrderSide::Buy,
                    order.amount,
                    price,
                    order.stop_loss,
                    order.take_profit,
                )?;
                let trade = Trade::new(
                    &order.symbol,
                    OrderSide::Buy,
                    order.amount,
                    price,
                    None,
                    TradeKind::Entry,
                );
                self.pm.log_trade(&trade)?;
                Ok(trade.id)
            }
            OrderSide::Sell => {
                let trade = self.pm.update_position(
                    &order.symbol,
                    OrderSide::Sell,
                    order.amount,
                    price,
                    None,
                    None,
                )?;
                Ok(trade
                    .map(|t| t.id)
                    .unwrap_or_else(|| format!("mock_{}", uuid::Uuid::new_v4().simple())))
            }
        }
    }
}

fn validate(order: &OrderRequest) -> Result<(&str, &str), TradedeskError> {
    let assets = order.assets()?;
    if !order.amount.is_finite() || order.amount <= 0.0 {
        return Err(TradedeskError::Validation {
            reason: format!("amount must be positive, got {}", order.amount),
        });
    }
    match order.price {
        Some(price) if !price.is_finite() || price <= 0.0 => {
            return Err(TradedeskError::Validation {
                reason: format!("price must be positive, got {price}"),
            });
        }
        None if order.order_type == OrderType::Limit => {
            return Err(TradedeskError::Validation {
                reason: "limit order requires a price".into(),
            });
        }
        _ => {}
    }
    Ok(assets)
}

fn reject(err: TradedeskError) -> OrderResult {
    let reason = match err {
        TradedeskError::Validation { reason } => reason,
        other => other.to_string(),
    };
    tracing::warn!(%reason, "order rejected");
    OrderResult::rejected(reason)
}

/// Sandbox or live execution through an exchange client.
pub struct RemoteExecutor {
    mode: ExecutionMode,
    api: Box<dyn TradingApiPort>,
}

impl RemoteExecutor {
    fn balance(&self, asset: &str) -> f64 {
        self.api.fetch_balance(asset).unwrap_or_else(|e| {
            tracing::warn!(error = %e, asset, "error fetching balance");
            0.0
        })
    }

    fn positions(&self) -> Vec<PositionView> {
        match self.api.fetch_positions() {
            Ok(positions) => positions
                .into_iter()
                .map(|p| {
                    let cost = p.amount * p.entry_price;
                    PositionView {
                        symbol: p.symbol,
                        amount: p.amount,
                        entry_price: p.entry_price,
                        current_price: p.mark_price,
                        unrealized_pnl: p.unrealized_pnl,
                        pnl_pct: if cost > 0.0 { p.unrealized_pnl / cost } else { 0.0 },
                        stop_loss: None,
                        take_profit: None,
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "error fetching positions");
                Vec::new()
            }
        }
    }

    fn submit(&self, order: &OrderRequest) -> OrderResult {
        tracing::info!(
            mode = %self.mode,
            side = %order.side,
            amount = order.amount,
            symbol = %order.symbol,
            "sending order"
        );

        if let Err(e) = validate(order) {
            return reject(e);
        }

        let ack = match self.api.create_order(order) {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(error = %e, "order placement failed");
                return OrderResult::failed(e.to_string());
            }
        };

        let latest = if ack.state == RemoteOrderState::Filled {
            ack
        } else {
            self.api
                .fetch_order(&order.symbol, &ack.order_id)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, order_id = %ack.order_id, "could not refresh order state");
                    ack
                })
        };

        let mut result = to_result(latest, order.price);
        if order.stop_loss.is_some() || order.take_profit.is_some() {
            let warning = format!(
                "stop-loss/take-profit ({:?}/{:?}) not placed as exchange orders in {} mode",
                order.stop_loss, order.take_profit, self.mode
            );
            tracing::warn!("{warning}");
            result.warnings.push(warning);
        }
        result
    }
}

fn to_result(remote: RemoteOrder, requested_price: Option<f64>) -> OrderResult {
    let price = remote.avg_price.or(requested_price);
    match remote.state {
        RemoteOrderState::Filled => OrderResult {
            status: OrderStatus::Filled,
            ..OrderResult::submitted(remote.order_id, price)
        },
        RemoteOrderState::Canceled => OrderResult {
            status: OrderStatus::Failed,
            reason: Some("order canceled by exchange".into()),
            ..OrderResult::submitted(remote.order_id, price)
        },
        RemoteOrderState::Live | RemoteOrderState::PartiallyFilled | RemoteOrderState::Unknown => {
            OrderResult::submitted(remote.order_id, price)
        }
    }
}
