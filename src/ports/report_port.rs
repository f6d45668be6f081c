//! Backtest output port trait.

use crate::domain::backtest::Trajectory;
use crate::domain::error::TradedeskError;

/// Port for writing the backtest trajectory table.
pub trait ReportPort {
    fn write_trajectory(
        &self,
        trajectory: &Trajectory,
        output_path: &str,
    ) -> Result<(), TradedeskError>;
}
