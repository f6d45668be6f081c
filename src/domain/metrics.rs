//! Performance statistics over a portfolio-value trajectory.
//!
//! Degenerate ratios (Sortino with no downside dispersion, Calmar with no drawdown,
//! profit factor with no losing periods) are reported as `f64::INFINITY` rather than
//! being dropped or clamped. [`PerformanceReport::is_unbounded`] tells callers apart.

use std::collections::BTreeMap;
use std::fmt;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub const TOTAL_RETURN: &str = "TotalReturn";
pub const CAGR: &str = "CAGR";
pub const VOLATILITY: &str = "Volatility";
pub const SHARPE_RATIO: &str = "SharpeRatio";
pub const SORTINO_RATIO: &str = "SortinoRatio";
pub const MAX_DRAWDOWN: &str = "MaxDrawdown";
pub const CALMAR_RATIO: &str = "CalmarRatio";
pub const WIN_RATE_DAILY: &str = "WinRateDaily";
pub const PROFIT_FACTOR_DAILY: &str = "ProfitFactorDaily";

/// Report keys in presentation order.
pub const METRIC_KEYS: [&str; 9] = [
    TOTAL_RETURN,
    CAGR,
    VOLATILITY,
    SHARPE_RATIO,
    SORTINO_RATIO,
    MAX_DRAWDOWN,
    CALMAR_RATIO,
    WIN_RATE_DAILY,
    PROFIT_FACTOR_DAILY,
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceReport {
    metrics: BTreeMap<String, f64>,
}

impl PerformanceReport {
    /// Compute the report from portfolio values. Needs at least two observations;
    /// otherwise the report is empty.
    pub fn compute(values: &[f64], risk_free_rate: f64) -> Self {
        if values.len() < 2 {
            return PerformanceReport::default();
        }

        let first = values[0];
        let last = values[values.len() - 1];
        let returns = period_returns(values);

        let total_return = last / first - 1.0;
        let cagr = (last / first).powf(TRADING_DAYS_PER_YEAR / values.len() as f64) - 1.0;

        let std = sample_stddev(&returns);
        let volatility = std * TRADING_DAYS_PER_YEAR.sqrt();

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let mean_return = mean(&returns);
        let mean_excess = mean_return - daily_rf;

        let sharpe = if std == 0.0 {
            0.0
        } else {
            (mean_excess / std) * TRADING_DAYS_PER_YEAR.sqrt()
        };

        let negatives: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let downside_std = sample_stddev(&negatives) * TRADING_DAYS_PER_YEAR.sqrt();
        let sortino = if downside_std == 0.0 {
            if mean_excess <= 0.0 {
                0.0
            } else {
                f64::INFINITY
            }
        } else {
            (mean_excess * TRADING_DAYS_PER_YEAR) / downside_std
        };

        let max_drawdown = max_drawdown(values);
        let calmar = if max_drawdown == 0.0 {
            f64::INFINITY
        } else {
            (mean_return * TRADING_DAYS_PER_YEAR) / max_drawdown.abs()
        };

        let wins = returns.iter().filter(|&&r| r > 0.0).count();
        let win_rate = wins as f64 / returns.len() as f64;

        let gross_profit: f64 = returns.iter().filter(|&&r| r > 0.0).sum();
        let gross_loss: f64 = negatives.iter().sum::<f64>().abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            f64::INFINITY
        };

        let metrics = [
            (TOTAL_RETURN, total_return),
            (CAGR, cagr),
            (VOLATILITY, volatility),
            (SHARPE_RATIO, sharpe),
            (SORTINO_RATIO, sortino),
            (MAX_DRAWDOWN, max_drawdown),
            (CALMAR_RATIO, calmar),
            (WIN_RATE_DAILY, win_rate),
            (PROFIT_FACTOR_DAILY, profit_factor),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        PerformanceReport { metrics }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// True when the metric exists and holds the `+inf` sentinel.
    pub fn is_unbounded(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v == f64::INFINITY)
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in METRIC_KEYS {
            if let Some(v) = self.get(key) {
                if v.is_infinite() {
                    writeln!(f, "{:<18} {}", key, if v > 0.0 { "inf" } else { "-inf" })?;
                } else {
                    writeln!(f, "{:<18} {:.4}", key, v)?;
                }
            }
        }
        Ok(())
    }
}

fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (n - 1). Fewer than two samples have no dispersion.
fn sample_stddev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

/// Most negative (value - running peak) / running peak; 0.0 when never under water.
fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}
