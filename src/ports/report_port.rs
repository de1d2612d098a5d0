//! Report generation port trait.

use crate::domain::account::AccountSnapshot;
use crate::domain::error::IndexEventError;
use crate::domain::order::OrderFill;
use crate::domain::position::ClosedPosition;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write_order_fills(&self, fills: &[OrderFill]) -> Result<(), IndexEventError>;

    fn write_positions(&self, positions: &[ClosedPosition]) -> Result<(), IndexEventError>;

    fn write_account(&self, history: &[AccountSnapshot]) -> Result<(), IndexEventError>;
}
