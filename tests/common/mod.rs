#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use indexevent::domain::account::AccountBalance;
use indexevent::domain::bar::{Bar, BarType, QuoteTick};
use indexevent::domain::error::IndexEventError;
use indexevent::domain::instrument::{Instrument, InstrumentId, Venue};
use indexevent::domain::order::MarketOrder;
use indexevent::domain::position::OpenPosition;
use indexevent::ports::data_port::DataPort;
use indexevent::ports::event_port::{EventRow, EventSource};
use indexevent::ports::execution_port::ExecutionPort;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;

/// Commands the strategy sent to the engine, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Subscribe(InstrumentId),
    Submit(MarketOrder),
    Close(InstrumentId),
}

/// Execution port that records commands and keeps a minimal position book.
pub struct MockExecution {
    pub venue: Venue,
    pub account: Option<AccountBalance>,
    pub positions: BTreeMap<InstrumentId, OpenPosition>,
    pub quotes: HashMap<InstrumentId, QuoteTick>,
    pub last_bars: HashMap<InstrumentId, Bar>,
    pub commands: Vec<EngineCommand>,
    pub failing_closes: HashSet<InstrumentId>,
    next_position_id: u64,
}

impl MockExecution {
    pub fn new() -> Self {
        Self {
            venue: venue(),
            account: Some(AccountBalance {
                venue: venue(),
                currency: "USD".into(),
                total: Decimal::new(5_000_000, 0),
                locked: Decimal::ZERO,
            }),
            positions: BTreeMap::new(),
            quotes: HashMap::new(),
            last_bars: HashMap::new(),
            commands: Vec::new(),
            failing_closes: HashSet::new(),
            next_position_id: 0,
        }
    }

    pub fn without_account(mut self) -> Self {
        self.account = None;
        self
    }

    pub fn with_free_balance(mut self, total: Decimal) -> Self {
        if let Some(account) = self.account.as_mut() {
            account.total = total;
        }
        self
    }

    pub fn with_failing_close(mut self, symbol: &str) -> Self {
        self.failing_closes.insert(id(symbol));
        self
    }

    /// Seed an open position directly, bypassing the strategy.
    pub fn with_position(mut self, symbol: &str, quantity: i64, price: f64) -> Self {
        self.next_position_id += 1;
        self.positions.insert(
            id(symbol),
            OpenPosition {
                position_id: self.next_position_id,
                instrument: id(symbol),
                quantity,
                avg_px_open: price,
                opened_at: ts("2024-01-01"),
            },
        );
        self
    }

    /// Mirror what a host does before delivering a bar.
    pub fn observe(&mut self, bar: &Bar) {
        self.last_bars.insert(bar.instrument.clone(), bar.clone());
    }

    pub fn submitted(&self) -> Vec<&MarketOrder> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                EngineCommand::Submit(o) => Some(o),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> Vec<&InstrumentId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                EngineCommand::Close(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<&InstrumentId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                EngineCommand::Subscribe(i) => Some(i),
                _ => None,
            })
            .collect()
    }
}

impl ExecutionPort for MockExecution {
    fn subscribe_bars(&mut self, bar_type: BarType) {
        self.commands
            .push(EngineCommand::Subscribe(bar_type.instrument));
    }

    fn submit_market_order(&mut self, order: MarketOrder) -> Result<(), IndexEventError> {
        let price = self
            .last_bars
            .get(&order.instrument)
            .map(|b| b.close)
            .unwrap_or(0.0);
        let opened_at = self
            .last_bars
            .get(&order.instrument)
            .map(|b| b.timestamp)
            .unwrap_or_default();
        self.next_position_id += 1;
        self.positions.insert(
            order.instrument.clone(),
            OpenPosition {
                position_id: self.next_position_id,
                instrument: order.instrument.clone(),
                quantity: order.quantity as i64 * order.side.sign(),
                avg_px_open: price,
                opened_at,
            },
        );
        self.commands.push(EngineCommand::Submit(order));
        Ok(())
    }

    fn close_position(&mut self, instrument: &InstrumentId) -> Result<(), IndexEventError> {
        if self.failing_closes.contains(instrument) {
            return Err(IndexEventError::Execution {
                instrument: instrument.to_string(),
                reason: "venue rejected close".into(),
            });
        }
        self.commands.push(EngineCommand::Close(instrument.clone()));
        self.positions.remove(instrument);
        Ok(())
    }

    fn position(&self, instrument: &InstrumentId) -> Option<OpenPosition> {
        self.positions.get(instrument).cloned()
    }

    fn open_positions(&self) -> Vec<OpenPosition> {
        self.positions.values().cloned().collect()
    }

    fn account_for_venue(&self, venue: &Venue) -> Option<AccountBalance> {
        self.account.clone().filter(|a| &a.venue == venue)
    }

    fn quote_tick(&self, instrument: &InstrumentId) -> Option<QuoteTick> {
        self.quotes.get(instrument).cloned()
    }

    fn last_bar(&self, instrument: &InstrumentId) -> Option<Bar> {
        self.last_bars.get(instrument).cloned()
    }
}

/// Event source returning a fixed table.
pub struct FixedEventSource {
    pub rows: Vec<EventRow>,
}

impl FixedEventSource {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn with_event(mut self, ticker: &str, announced: &str, trade: &str) -> Self {
        self.rows.push(EventRow {
            ticker: ticker.to_string(),
            announced: Some(day(announced)),
            trade_date: Some(day(trade)),
        });
        self
    }

    pub fn with_unresolved(mut self, ticker: &str, announced: &str) -> Self {
        self.rows.push(EventRow {
            ticker: ticker.to_string(),
            announced: Some(day(announced)),
            trade_date: None,
        });
        self
    }
}

impl EventSource for FixedEventSource {
    fn read_events(&self) -> Result<Vec<EventRow>, IndexEventError> {
        Ok(self.rows.clone())
    }
}

pub struct BrokenEventSource;

impl EventSource for BrokenEventSource {
    fn read_events(&self) -> Result<Vec<EventRow>, IndexEventError> {
        Err(IndexEventError::data_load("missing required column 'Trade Date'"))
    }
}

pub struct MockDataPort {
    pub instruments: Vec<Instrument>,
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            instruments: Vec::new(),
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_instrument(mut self, symbol: &str) -> Self {
        self.instruments.push(instrument(symbol));
        self
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_instruments(&self) -> Result<Vec<Instrument>, IndexEventError> {
        Ok(self.instruments.clone())
    }

    fn list_series(&self) -> Result<Vec<String>, IndexEventError> {
        let mut symbols: Vec<String> = self
            .data
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    fn fetch_bars(&self, instrument: &Instrument) -> Result<Vec<Bar>, IndexEventError> {
        let symbol = &instrument.id.symbol;
        if let Some(reason) = self.errors.get(symbol) {
            return Err(IndexEventError::data_load(reason.clone()));
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

pub fn venue() -> Venue {
    Venue::new("SIM")
}

pub fn id(symbol: &str) -> InstrumentId {
    InstrumentId::new(symbol, venue())
}

pub fn instrument(symbol: &str) -> Instrument {
    Instrument {
        id: id(symbol),
        currency: "USD".into(),
        tick_size: 0.01,
        lot_size: 1,
        min_quantity: 1,
        max_quantity: 0,
        margin: 0.0,
    }
}

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(s: &str) -> NaiveDateTime {
    day(s).and_hms_opt(0, 0, 0).unwrap()
}

pub fn make_bar(symbol: &str, date: &str, open: f64, close: f64) -> Bar {
    Bar {
        instrument: id(symbol),
        timestamp: ts(date),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume: 1000.0,
    }
}

/// Flat bars (open == close) on consecutive calendar days.
pub fn generate_bars(symbol: &str, start_date: &str, count: usize, price: f64) -> Vec<Bar> {
    let start = day(start_date);
    (0..count)
        .map(|i| {
            let d = start + chrono::Duration::days(i as i64);
            make_bar(symbol, &d.format("%Y-%m-%d").to_string(), price, price)
        })
        .collect()
}

pub fn write_file(path: &std::path::Path, content: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}
