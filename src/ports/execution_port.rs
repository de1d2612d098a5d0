//! Execution engine port trait.
//!
//! Everything the strategy needs from the hosting backtest engine: bar
//! subscriptions, market orders, position closing and account/price lookups.

use crate::domain::account::{AccountBalance, AccountSnapshot};
use crate::domain::bar::{Bar, BarType, QuoteTick};
use crate::domain::error::IndexEventError;
use crate::domain::instrument::{InstrumentId, Venue};
use crate::domain::order::{MarketOrder, OrderFill};
use crate::domain::position::{ClosedPosition, OpenPosition};

pub trait ExecutionPort {
    fn subscribe_bars(&mut self, bar_type: BarType);

    fn submit_market_order(&mut self, order: MarketOrder) -> Result<(), IndexEventError>;

    /// Flatten the open position on `instrument`, if any.
    fn close_position(&mut self, instrument: &InstrumentId) -> Result<(), IndexEventError>;

    fn position(&self, instrument: &InstrumentId) -> Option<OpenPosition>;

    /// Every open position across all instruments.
    fn open_positions(&self) -> Vec<OpenPosition>;

    fn account_for_venue(&self, venue: &Venue) -> Option<AccountBalance>;

    fn quote_tick(&self, instrument: &InstrumentId) -> Option<QuoteTick>;

    fn last_bar(&self, instrument: &InstrumentId) -> Option<Bar>;
}

/// Host-side hooks the backtest runner drives on the venue.
pub trait MarketReplay {
    /// Record `bar` as the latest market state for its instrument.
    fn update_market(&mut self, bar: &Bar);

    fn is_subscribed(&self, instrument: &InstrumentId) -> bool;

    /// Called once after the last bar of each trading day.
    fn close_day(&mut self, date: chrono::NaiveDate);

    fn fills(&self) -> &[OrderFill];

    fn closed_positions(&self) -> &[ClosedPosition];

    fn account_history(&self) -> &[AccountSnapshot];
}
