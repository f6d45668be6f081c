//! Paper-trading position bookkeeping over a [`LedgerPort`].
//!
//! Reads never fail: a missing or unreadable artifact falls back to its default
//! (seed balance, no positions, empty history) and the problem is logged.

use crate::ports::ledger_port::LedgerPort;

use super::error::TradedeskError;
use super::order::OrderSide;
use super::position::{default_balance, Balance, Position, Positions, Trade, TradeKind};

pub struct PositionManager {
    ledger: Box<dyn LedgerPort>,
}

impl PositionManager {
    pub fn new(ledger: Box<dyn LedgerPort>) -> Self {
        PositionManager { ledger }
    }

    pub fn get_balance(&self) -> Balance {
        match self.ledger.load_balance() {
            Ok(Some(balance)) => balance,
            Ok(None) => default_balance(),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable balance, using default");
                default_balance()
            }
        }
    }

    pub fn save_balance(&self, balance: &Balance) -> Result<(), TradedeskError> {
        self.ledger.save_balance(balance)
    }

    pub fn get_positions(&self) -> Positions {
        match self.ledger.load_positions() {
            Ok(Some(positions)) => positions,
            Ok(None) => Positions::new(),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable positions, assuming none open");
                Positions::new()
            }
        }
    }

    pub fn save_positions(&self, positions: &Positions) -> Result<(), TradedeskError> {
        self.ledger.save_positions(positions)
    }

    pub fn log_trade(&self, trade: &Trade) -> Result<(), TradedeskError> {
        self.ledger.append_trade(trade)
    }

    pub fn get_history(&self) -> Vec<Trade> {
        self.ledger.load_trades().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "unreadable trade history");
            Vec::new()
        })
    }

    /// Apply a fill to the open position for `symbol`.
    ///
    /// Buys open or average into the position; stop/take levels are only replaced when
    /// given. Sells book realized PnL against the average entry, log a `reduce` or
    /// `close` trade and drop the position once the remainder is dust. A sell with no
    /// open position changes nothing and returns `Ok(None)`.
    pub fn update_position(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
        price: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<Option<Trade>, TradedeskError> {
        let mut positions = self.get_positions();

        let trade = match side {
            OrderSide::Buy => {
                match positions.get_mut(symbol) {
                    Some(pos) => {
                        let new_amount = pos.amount + amount;
                        pos.entry_price = if new_amount > 0.0 {
                            (pos.amount * pos.entry_price + amount * price) / new_amount
                        } else {
                            0.0
                        };
                        pos.amount = new_amount;
                        if stop_loss.is_some() {
                            pos.stop_loss = stop_loss;
                        }
                        if take_profit.is_some() {
                            pos.take_profit = take_profit;
                        }
                    }
                    None => {
                        positions.insert(
                            symbol.to_string(),
                            Position {
                                amount,
                                entry_price: price,
                                stop_loss,
                                take_profit,
                            },
                        );
                    }
                }
                None
            }
            OrderSide::Sell => {
                let Some(pos) = positions.get_mut(symbol) else {
                    tracing::warn!(symbol, "sell with no open position; ledger unchanged");
                    return Ok(None);
                };

                let pnl = (price - pos.entry_price) * amount;
                let kind = if amount >= pos.amount {
                    TradeKind::Close
                } else {
                    TradeKind::Reduce
                };
                let trade = Trade::new(symbol, OrderSide::Sell, amount, price, Some(pnl), kind);
                self.log_trade(&trade)?;

                pos.amount -= amount;
                if pos.is_dust() {
                    positions.remove(symbol);
                }
                Some(trade)
            }
        };

        self.save_positions(&positions)?;
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// In-memory ledger; `fail_reads` simulates a corrupt store.
    #[derive(Default)]
    struct MemoryLedger {
        balance: RefCell<Option<Balance>>,
        positions: RefCell<Option<Positions>>,
        trades: RefCell<Vec<Trade>>,
        fail_reads: bool,
    }

    impl LedgerPort for Rc<MemoryLedger> {
        fn load_balance(&self) -> Result<Option<Balance>, TradedeskError> {
            if self.fail_reads {
                return Err(TradedeskError::persistence("balance", "corrupt"));
            }
            Ok(self.balance.borrow().clone())
        }
        fn save_balance(&self, balance: &Balance) -> Result<(), TradedeskError> {
            *self.balance.borrow_mut() = Some(balance.clone());
            Ok(())
        }
        fn load_positions(&self) -> Result<Option<Positions>, TradedeskError> {
            if self.fail_reads {
                return Err(TradedeskError::persistence("positions", "corrupt"));
            }
            Ok(self.positions.borrow().clone())
        }
        fn save_positions(&self, positions: &Positions) -> Result<(), TradedeskError> {
            *self.positions.borrow_mut() = Some(positions.clone());
            Ok(())
        }
        fn append_trade(&self, trade: &Trade) -> Result<(), TradedeskError> {
            self.trades.borrow_mut().push(trade.clone());
            Ok(())
        }
        fn load_trades(&self) -> Result<Vec<Trade>, TradedeskError> {
            if self.fail_reads {
                return Err(TradedeskError::persistence("history", "corrupt"));
            }
            Ok(self.trades.borrow().clone())
        }
    }

    fn manager() -> (PositionManager, Rc<MemoryLedger>) {
        let ledger = Rc::new(MemoryLedger::default());
        (PositionManager::new(Box::new(ledger.clone())), ledger)
    }

    #[test]
    fn empty_ledger_defaults() {
        let (pm, _) = manager();
        assert_eq!(pm.get_balance(), default_balance());
        assert!(pm.get_positions().is_empty());
        assert!(pm.get_history().is_empty());
    }

    #[test]
    fn corrupt_ledger_falls_back_to_defaults() {
        let ledger = Rc::new(MemoryLedger {
            fail_reads: true,
            ..Default::default()
        });
        let pm = PositionManager::new(Box::new(ledger));
        assert_eq!(pm.get_balance(), default_balance());
        assert!(pm.get_positions().is_empty());
        assert!(pm.get_history().is_empty());
    }

    #[test]
    fn buy_opens_position_with_levels() {
        let (pm, _) = manager();
        let trade = pm
            .update_position("BTC/USDT", OrderSide::Buy, 1.0, 50_000.0, Some(49_000.0), Some(55_000.0))
            .unwrap();
        assert!(trade.is_none());

        let pos = &pm.get_positions()["BTC/USDT"];
        assert_eq!(pos.amount, 1.0);
        assert_eq!(pos.entry_price, 50_000.0);
        assert_eq!(pos.stop_loss, Some(49_000.0));
        assert_eq!(pos.take_profit, Some(55_000.0));
    }

    #[test]
    fn second_buy_averages_cost_and_keeps_levels() {
        let (pm, _) = manager();
        pm.update_position("BTC/USDT", OrderSide::Buy, 1.0, 50_000.0, Some(49_000.0), None)
            .unwrap();
        pm.update_position("BTC/USDT", OrderSide::Buy, 1.0, 60_000.0, None, Some(70_000.0))
            .unwrap();

        let pos = &pm.get_positions()["BTC/USDT"];
        assert_eq!(pos.amount, 2.0);
        assert_eq!(pos.entry_price, 55_000.0);
        assert_eq!(pos.stop_loss, Some(49_000.0));
        assert_eq!(pos.take_profit, Some(70_000.0));
    }

    #[test]
    fn partial_sell_books_pnl_as_reduce() {
        let (pm, ledger) = manager();
        pm.update_position("BTC/USDT", OrderSide::Buy, 1.0, 50_000.0, None, None).unwrap();
        pm.update_position("BTC/USDT", OrderSide::Buy, 1.0, 60_000.0, None, None).unwrap();

        let trade = pm
            .update_position("BTC/USDT", OrderSide::Sell, 1.0, 60_000.0, None, None)
            .unwrap()
            .unwrap();

        assert_eq!(trade.pnl, Some(5_000.0));
        assert_eq!(trade.kind, TradeKind::Reduce);
        assert_eq!(pm.get_positions()["BTC/USDT"].amount, 1.0);
        assert_eq!(ledger.trades.borrow().len(), 1);
    }

    #[test]
    fn full_sell_closes_and_removes() {
        let (pm, _) = manager();
        pm.update_position("ETH/USDT", OrderSide::Buy, 2.0, 3_000.0, None, None).unwrap();
        let trade = pm
            .update_position("ETH/USDT", OrderSide::Sell, 2.0, 2_500.0, None, None)
            .unwrap()
            .unwrap();

        assert_eq!(trade.kind, TradeKind::Close);
        assert_eq!(trade.pnl, Some(-1_000.0));
        assert!(!pm.get_positions().contains_key("ETH/USDT"));
    }

    #[test]
    fn dust_remainder_is_removed() {
        let (pm, _) = manager();
        pm.update_position("BTC/USDT", OrderSide::Buy, 1.0, 100.0, None, None).unwrap();
        let trade = pm
            .update_position("BTC/USDT", OrderSide::Sell, 1.0 - 1e-8, 100.0, None, None)
            .unwrap()
            .unwrap();

        assert_eq!(trade.kind, TradeKind::Reduce);
        assert!(pm.get_positions().is_empty());
    }

    #[test]
    fn sell_without_position_is_noop() {
        let (pm, ledger) = manager();
        let trade = pm
            .update_position("SOL/USDT", OrderSide::Sell, 1.0, 10.0, None, None)
            .unwrap();
        assert!(trade.is_none());
        assert!(ledger.trades.borrow().is_empty());
        assert!(ledger.positions.borrow().is_none());
    }

    #[test]
    fn balance_round_trip() {
        let (pm, ledger) = manager();
        let mut bal = pm.get_balance();
        bal.insert("USDT".into(), 9_000.0);
        pm.save_balance(&bal).unwrap();

        let reopened = PositionManager::new(Box::new(ledger));
        assert_eq!(reopened.get_balance()["USDT"], 9_000.0);
    }
}
