//! Signal-driven single-asset backtest.
//!
//! Replays a price series against a target-exposure series. Both are joined on
//! timestamp and walked strictly in time order; the signal at `t` only ever trades at
//! the close of `t`, so no step can see a later price.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::ohlcv::PricePoint;
use super::signal::{Exposure, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fractional fee charged on each fill, e.g. 0.001 for 0.1%.
    pub commission: f64,
    /// Annualized, used by the performance report.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            commission: 0.001,
            risk_free_rate: 0.0,
        }
    }
}

/// Portfolio snapshot after processing one aligned timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub position: f64,
    pub mark_price: f64,
}

impl PortfolioState {
    /// Mark-to-market value: cash + position * mark_price.
    pub fn value(&self) -> f64 {
        self.cash + self.position * self.mark_price
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub states: Vec<PortfolioState>,
}

impl Trajectory {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.states.iter().map(PortfolioState::value).collect()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.states.last().map(PortfolioState::value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trajectory: Trajectory,
    pub trades: usize,
}

pub struct Backtester {
    initial_capital: f64,
    commission: f64,
}

impl Backtester {
    pub fn new(initial_capital: f64, commission: f64) -> Self {
        Backtester {
            initial_capital,
            commission,
        }
    }

    pub fn from_config(config: &BacktestConfig) -> Self {
        Backtester::new(config.initial_capital, config.commission)
    }

    /// Inner-join prices and signals on timestamp. A later signal for the same
    /// timestamp replaces an earlier one.
    pub fn align(prices: &[PricePoint], signals: &[Signal]) -> Vec<(NaiveDateTime, f64, Exposure)> {
        let by_time: BTreeMap<NaiveDateTime, Exposure> = signals
            .iter()
            .map(|s| (s.timestamp, s.exposure))
            .collect();

        let mut closes: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
        for p in prices {
            closes.insert(p.timestamp, p.close);
        }

        closes
            .into_iter()
            .filter_map(|(ts, close)| by_time.get(&ts).map(|&exp| (ts, close, exp)))
            .collect()
    }

    pub fn run(&self, prices: &[PricePoint], signals: &[Signal]) -> BacktestResult {
        let aligned = Self::align(prices, signals);
        if aligned.is_empty() {
            tracing::warn!(
                prices = prices.len(),
                signals = signals.len(),
                "no common timestamps between prices and signals; empty trajectory"
            );
            return BacktestResult {
                trajectory: Trajectory::default(),
                trades: 0,
            };
        }

        let mut cash = self.initial_capital;
        let mut position = 0.0_f64;
        let mut prev_target = Exposure::Flat;
        let mut trades = 0usize;
        let mut states = Vec::with_capacity(aligned.len());

        for (timestamp, price, target) in aligned {
            match (prev_target, target) {
                (Exposure::Flat, Exposure::Long) => {
                    let shares = cash / (price * (1.0 + self.commission));
                    tracing::debug!(%timestamp, price, shares, "enter long");
                    position = shares;
                    cash = 0.0;
                    trades += 1;
                }
                (Exposure::Long, Exposure::Flat) => {
                    let proceeds = position * price;
                    tracing::debug!(%timestamp, price, proceeds, "exit to cash");
                    cash = proceeds * (1.0 - self.commission);
                    position = 0.0;
                    trades += 1;
                }
                _ => {}
            }

            states.push(PortfolioState {
                timestamp,
                cash,
                position,
                mark_price: price,
            });
            prev_target = target;
        }

        BacktestResult {
            trajectory: Trajectory { states },
            trades,
        }
    }
}
