//! Account balance snapshot as reported by the execution port.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::instrument::Venue;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub venue: Venue,
    pub currency: String,
    pub total: Decimal,
    pub locked: Decimal,
}

impl AccountBalance {
    pub fn free(&self) -> Decimal {
        self.total - self.locked
    }
}

/// Account state recorded after each fill and at each day close.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub timestamp: NaiveDateTime,
    pub total: Decimal,
    pub locked: Decimal,
    pub free: Decimal,
    pub equity: Decimal,
}
