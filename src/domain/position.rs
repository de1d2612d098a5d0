//! Venue-side positions as reported by the execution port.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::instrument::InstrumentId;

/// Net open position. Positive quantity is long, negative is short.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub position_id: u64,
    pub instrument: InstrumentId,
    pub quantity: i64,
    pub avg_px_open: f64,
    pub opened_at: NaiveDateTime,
}

impl OpenPosition {
    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn notional(&self) -> f64 {
        self.quantity.unsigned_abs() as f64 * self.avg_px_open
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.avg_px_open)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedPosition {
    pub position_id: u64,
    pub instrument: InstrumentId,
    pub quantity: i64,
    pub avg_px_open: f64,
    pub avg_px_close: f64,
    pub opened_at: NaiveDateTime,
    pub closed_at: NaiveDateTime,
    pub commissions: Decimal,
    pub realized_pnl: Decimal,
}
