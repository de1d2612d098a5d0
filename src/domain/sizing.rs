//! Order sizing.
//!
//! Quantity = min(floor(free_balance * max_position_ratio / price), trade_size).
//! Degenerate inputs (no account, no free balance, no usable price) size to
//! zero; the caller skips the order and logs a warning.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use super::instrument::{InstrumentId, Venue};
use super::order::OrderSide;
use crate::ports::execution_port::ExecutionPort;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingInputs {
    pub free_balance: Decimal,
    pub max_position_ratio: Decimal,
    pub reference_price: Decimal,
    pub configured_trade_size: u64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingDegeneracy {
    #[error("account not found for venue {0}")]
    NoAccount(Venue),

    #[error("insufficient free balance: {0}")]
    NoFreeBalance(Decimal),

    #[error("unable to obtain a valid price for {0}")]
    NoPrice(InstrumentId),
}

pub fn size(direction: OrderSide, inputs: &SizingInputs) -> u64 {
    if inputs.free_balance <= Decimal::ZERO
        || inputs.reference_price <= Decimal::ZERO
        || inputs.max_position_ratio <= Decimal::ZERO
    {
        return 0;
    }
    let cap_value = inputs.free_balance * inputs.max_position_ratio;
    let raw_size = cap_value / inputs.reference_price;
    let whole = raw_size.floor().to_u64().unwrap_or(u64::MAX);
    let quantity = whole.min(inputs.configured_trade_size);
    debug!(%direction, %cap_value, %raw_size, quantity, "sized order");
    quantity
}

/// Sizing parameters fixed for the life of a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSizer {
    pub max_position_ratio: Decimal,
    pub trade_size: u64,
}

impl OrderSizer {
    pub fn new(max_position_ratio: Decimal, trade_size: u64) -> Self {
        Self {
            max_position_ratio,
            trade_size,
        }
    }

    /// Gather sizing inputs from the execution port.
    ///
    /// Price preference: `current_price`, then the quote (ask for buys, bid
    /// for sells), then the last bar close.
    pub fn inputs(
        &self,
        side: OrderSide,
        instrument: &InstrumentId,
        current_price: Option<f64>,
        ctx: &dyn ExecutionPort,
    ) -> Result<SizingInputs, SizingDegeneracy> {
        let account = ctx
            .account_for_venue(&instrument.venue)
            .ok_or_else(|| SizingDegeneracy::NoAccount(instrument.venue.clone()))?;

        let free_balance = account.free();
        if free_balance <= Decimal::ZERO {
            return Err(SizingDegeneracy::NoFreeBalance(free_balance));
        }

        let price = current_price
            .and_then(positive_decimal)
            .or_else(|| {
                ctx.quote_tick(instrument).and_then(|q| match side {
                    OrderSide::Buy => positive_decimal(q.ask),
                    OrderSide::Sell => positive_decimal(q.bid),
                })
            })
            .or_else(|| ctx.last_bar(instrument).and_then(|b| positive_decimal(b.close)))
            .ok_or_else(|| SizingDegeneracy::NoPrice(instrument.clone()))?;

        Ok(SizingInputs {
            free_balance,
            max_position_ratio: self.max_position_ratio,
            reference_price: price,
            configured_trade_size: self.trade_size,
        })
    }

    pub fn size_order(
        &self,
        side: OrderSide,
        instrument: &InstrumentId,
        current_price: Option<f64>,
        ctx: &dyn ExecutionPort,
    ) -> Result<u64, SizingDegeneracy> {
        let inputs = self.inputs(side, instrument, current_price, ctx)?;
        Ok(size(side, &inputs))
    }
}

fn positive_decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok().filter(|d| *d > Decimal::ZERO)
}
