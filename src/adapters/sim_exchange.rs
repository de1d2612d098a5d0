//! Simulated single-venue exchange.
//!
//! Market orders fill immediately at the last bar close of the instrument.
//! Positions are netted per instrument. The ledger keeps a total balance
//! (starting balance + realized PnL - commissions) and locks the entry
//! notional of every open position; free = total - locked.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::domain::account::{AccountBalance, AccountSnapshot};
use crate::domain::bar::{Bar, BarType, QuoteTick};
use crate::domain::error::IndexEventError;
use crate::domain::instrument::{Instrument, InstrumentId, Venue};
use crate::domain::order::{MarketOrder, OrderFill, OrderSide};
use crate::domain::position::{ClosedPosition, OpenPosition};
use crate::ports::execution_port::{ExecutionPort, MarketReplay};

#[derive(Debug, Clone, PartialEq)]
pub struct SimExchangeConfig {
    pub venue: Venue,
    pub base_currency: String,
    pub starting_balance: Decimal,
    pub commission_per_share: Decimal,
}

impl Default for SimExchangeConfig {
    fn default() -> Self {
        SimExchangeConfig {
            venue: Venue::new("SIM"),
            base_currency: "USD".to_string(),
            starting_balance: Decimal::new(5_000_000, 0),
            commission_per_share: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct PositionLedger {
    position: OpenPosition,
    peak_quantity: i64,
    closed_quantity: u64,
    closed_value: Decimal,
    realized: Decimal,
    commissions: Decimal,
}

pub struct SimulatedExchange {
    config: SimExchangeConfig,
    instruments: HashMap<InstrumentId, Instrument>,
    subscriptions: HashSet<InstrumentId>,
    last_bars: HashMap<InstrumentId, Bar>,
    // BTreeMap so open_positions() is deterministic.
    positions: BTreeMap<InstrumentId, PositionLedger>,
    total: Decimal,
    next_order_id: u64,
    next_position_id: u64,
    fills: Vec<OrderFill>,
    closed: Vec<ClosedPosition>,
    account_history: Vec<AccountSnapshot>,
}

fn execution_error(instrument: &InstrumentId, reason: impl Into<String>) -> IndexEventError {
    IndexEventError::Execution {
        instrument: instrument.to_string(),
        reason: reason.into(),
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or_default()
}

impl SimulatedExchange {
    pub fn new(config: SimExchangeConfig) -> Self {
        Self {
            total: config.starting_balance,
            config,
            instruments: HashMap::new(),
            subscriptions: HashSet::new(),
            last_bars: HashMap::new(),
            positions: BTreeMap::new(),
            next_order_id: 0,
            next_position_id: 0,
            fills: Vec::new(),
            closed: Vec::new(),
            account_history: Vec::new(),
        }
    }

    pub fn add_instrument(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.id.clone(), instrument);
    }

    pub fn venue(&self) -> &Venue {
        &self.config.venue
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &InstrumentId> {
        self.subscriptions.iter()
    }

    fn locked(&self) -> Decimal {
        self.positions
            .values()
            .map(|l| to_decimal(l.position.notional()))
            .sum()
    }

    fn unrealized(&self) -> Decimal {
        self.positions
            .values()
            .filter_map(|l| {
                let bar = self.last_bars.get(&l.position.instrument)?;
                Some(to_decimal(l.position.unrealized_pnl(bar.close)))
            })
            .sum()
    }

    pub fn balance(&self) -> AccountBalance {
        AccountBalance {
            venue: self.config.venue.clone(),
            currency: self.config.base_currency.clone(),
            total: self.total,
            locked: self.locked(),
        }
    }

    pub fn equity(&self) -> Decimal {
        self.total + self.unrealized()
    }

    fn snapshot(&mut self, timestamp: NaiveDateTime) {
        let balance = self.balance();
        let equity = self.equity();
        self.account_history.push(AccountSnapshot {
            timestamp,
            total: balance.total,
            locked: balance.locked,
            free: balance.free(),
            equity,
        });
    }

    fn open_new(
        &mut self,
        instrument: &InstrumentId,
        signed: i64,
        price: f64,
        ts: NaiveDateTime,
    ) -> u64 {
        self.next_position_id += 1;
        let position = OpenPosition {
            position_id: self.next_position_id,
            instrument: instrument.clone(),
            quantity: signed,
            avg_px_open: price,
            opened_at: ts,
        };
        self.positions.insert(
            instrument.clone(),
            PositionLedger {
                position,
                peak_quantity: signed,
                closed_quantity: 0,
                closed_value: Decimal::ZERO,
                realized: Decimal::ZERO,
                commissions: Decimal::ZERO,
            },
        );
        self.next_position_id
    }

    /// Apply a fill of `signed` shares at `price`; returns the position id the
    /// fill is booked against.
    fn apply_fill(
        &mut self,
        instrument: &InstrumentId,
        signed: i64,
        price: f64,
        commission: Decimal,
        ts: NaiveDateTime,
    ) -> u64 {
        let Some(mut ledger) = self.positions.remove(instrument) else {
            let id = self.open_new(instrument, signed, price, ts);
            if let Some(l) = self.positions.get_mut(instrument) {
                l.commissions += commission;
            }
            return id;
        };

        let held = ledger.position.quantity;
        let position_id = ledger.position.position_id;
        ledger.commissions += commission;

        if held.signum() == signed.signum() {
            let new_qty = held + signed;
            let avg = (held.unsigned_abs() as f64 * ledger.position.avg_px_open
                + signed.unsigned_abs() as f64 * price)
                / new_qty.unsigned_abs() as f64;
            ledger.position.quantity = new_qty;
            ledger.position.avg_px_open = avg;
            if new_qty.abs() > ledger.peak_quantity.abs() {
                ledger.peak_quantity = new_qty;
            }
            self.positions.insert(instrument.clone(), ledger);
            return position_id;
        }

        let closing = held.unsigned_abs().min(signed.unsigned_abs());
        let realized = Decimal::from(closing)
            * (to_decimal(price) - to_decimal(ledger.position.avg_px_open))
            * Decimal::from(held.signum());
        self.total += realized;
        ledger.realized += realized;
        ledger.closed_quantity += closing;
        ledger.closed_value += Decimal::from(closing) * to_decimal(price);

        let remaining = held + signed;
        if remaining != 0 && remaining.signum() == held.signum() {
            ledger.position.quantity = remaining;
            self.positions.insert(instrument.clone(), ledger);
            return position_id;
        }

        let avg_px_close = if ledger.closed_quantity > 0 {
            (ledger.closed_value / Decimal::from(ledger.closed_quantity))
                .to_f64()
                .unwrap_or(price)
        } else {
            price
        };
        self.closed.push(ClosedPosition {
            position_id,
            instrument: instrument.clone(),
            quantity: ledger.peak_quantity,
            avg_px_open: ledger.position.avg_px_open,
            avg_px_close,
            opened_at: ledger.position.opened_at,
            closed_at: ts,
            commissions: ledger.commissions,
            realized_pnl: ledger.realized - ledger.commissions,
        });

        if remaining != 0 {
            // Flipped through flat: the remainder opens a fresh position.
            self.open_new(instrument, remaining, price, ts);
        }
        position_id
    }
}

impl ExecutionPort for SimulatedExchange {
    fn subscribe_bars(&mut self, bar_type: BarType) {
        debug!(instrument = %bar_type.instrument, "bar subscription");
        self.subscriptions.insert(bar_type.instrument);
    }

    fn submit_market_order(&mut self, order: MarketOrder) -> Result<(), IndexEventError> {
        if order.instrument.venue != self.config.venue {
            return Err(execution_error(&order.instrument, "unknown venue"));
        }
        let quantity = match self.instruments.get(&order.instrument) {
            Some(inst) => inst.normalize_quantity(order.quantity),
            None => order.quantity,
        };
        if quantity == 0 {
            return Err(execution_error(
                &order.instrument,
                format!("quantity {} below instrument minimum", order.quantity),
            ));
        }
        let bar = self
            .last_bars
            .get(&order.instrument)
            .ok_or_else(|| execution_error(&order.instrument, "no market price"))?;
        let price = bar.close;
        let ts = bar.timestamp;
        let signed = i64::try_from(quantity)
            .map_err(|_| execution_error(&order.instrument, "quantity overflow"))?
            * order.side.sign();
        let commission = self.config.commission_per_share * Decimal::from(quantity);

        self.total -= commission;
        let position_id = self.apply_fill(&order.instrument, signed, price, commission, ts);
        self.next_order_id += 1;
        self.fills.push(OrderFill {
            order_id: self.next_order_id,
            position_id,
            instrument: order.instrument.clone(),
            side: order.side,
            quantity,
            price,
            commission,
            timestamp: ts,
        });
        debug!(
            instrument = %order.instrument,
            side = %order.side,
            quantity,
            price,
            "order filled"
        );
        self.snapshot(ts);
        Ok(())
    }

    fn close_position(&mut self, instrument: &InstrumentId) -> Result<(), IndexEventError> {
        let Some(ledger) = self.positions.get(instrument) else {
            return Ok(());
        };
        let held = ledger.position.quantity;
        let side = if held > 0 { OrderSide::Sell } else { OrderSide::Buy };
        // Bypass lot normalization: a close always flattens the full quantity.
        let bar = self
            .last_bars
            .get(instrument)
            .ok_or_else(|| execution_error(instrument, "no market price"))?;
        let price = bar.close;
        let ts = bar.timestamp;
        let quantity = held.unsigned_abs();
        let commission = self.config.commission_per_share * Decimal::from(quantity);

        self.total -= commission;
        let position_id = self.apply_fill(instrument, -held, price, commission, ts);
        self.next_order_id += 1;
        self.fills.push(OrderFill {
            order_id: self.next_order_id,
            position_id,
            instrument: instrument.clone(),
            side,
            quantity,
            price,
            commission,
            timestamp: ts,
        });
        self.snapshot(ts);
        Ok(())
    }

    fn position(&self, instrument: &InstrumentId) -> Option<OpenPosition> {
        self.positions.get(instrument).map(|l| l.position.clone())
    }

    fn open_positions(&self) -> Vec<OpenPosition> {
        self.positions.values().map(|l| l.position.clone()).collect()
    }

    fn account_for_venue(&self, venue: &Venue) -> Option<AccountBalance> {
        (venue == &self.config.venue).then(|| self.balance())
    }

    // Bar-only replay: there is no quote stream.
    fn quote_tick(&self, _instrument: &InstrumentId) -> Option<QuoteTick> {
        None
    }

    fn last_bar(&self, instrument: &InstrumentId) -> Option<Bar> {
        self.last_bars.get(instrument).cloned()
    }
}

impl MarketReplay for SimulatedExchange {
    fn update_market(&mut self, bar: &Bar) {
        self.last_bars.insert(bar.instrument.clone(), bar.clone());
    }

    fn is_subscribed(&self, instrument: &InstrumentId) -> bool {
        self.subscriptions.contains(instrument)
    }

    fn close_day(&mut self, date: NaiveDate) {
        let ts = date.and_hms_opt(23, 59, 59).unwrap_or_default();
        self.snapshot(ts);
    }

    fn fills(&self) -> &[OrderFill] {
        &self.fills
    }

    fn closed_positions(&self) -> &[ClosedPosition] {
        &self.closed
    }

    fn account_history(&self) -> &[AccountSnapshot] {
        &self.account_history
    }
}
