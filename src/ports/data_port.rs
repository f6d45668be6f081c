//! Price and signal input port trait.

use crate::domain::error::TradedeskError;
use crate::domain::ohlcv::PricePoint;
use crate::domain::signal::Signal;

pub trait DataPort {
    /// Timestamp-indexed OHLCV series for one instrument.
    fn load_prices(&self, source: &str) -> Result<Vec<PricePoint>, TradedeskError>;

    /// Timestamp-indexed target-exposure series.
    fn load_signals(&self, source: &str) -> Result<Vec<Signal>, TradedeskError>;
}
