//! Order commands issued to the execution port.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

use super::instrument::InstrumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("BUY"),
            OrderSide::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketOrder {
    pub instrument: InstrumentId,
    pub side: OrderSide,
    pub quantity: u64,
}

/// Execution of a market order at the venue.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFill {
    pub order_id: u64,
    pub position_id: u64,
    pub instrument: InstrumentId,
    pub side: OrderSide,
    pub quantity: u64,
    pub price: f64,
    pub commission: Decimal,
    pub timestamp: NaiveDateTime,
}
