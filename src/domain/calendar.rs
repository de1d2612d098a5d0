//! Index-change event calendar.
//!
//! Maps a normalized symbol to the announcement/trade-date windows found in
//! the event table. Built once at strategy start, read-only afterwards.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::domain::error::IndexEventError;
use crate::ports::event_port::{EventRow, EventSource};

/// One index-membership-change episode for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub announcement_date: NaiveDate,
    pub trade_date: NaiveDate,
}

impl EventWindow {
    /// First session after the announcement.
    pub fn entry_date(&self) -> Option<NaiveDate> {
        self.announcement_date.succ_opt()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCalendar {
    events: HashMap<String, Vec<EventWindow>>,
}

/// Truncate a raw ticker at the first whitespace (`"AAPL US Equity"` -> `"AAPL"`).
pub fn normalize_symbol(raw: &str) -> &str {
    raw.split_whitespace().next().unwrap_or("")
}

impl EventCalendar {
    pub fn load(source: &dyn EventSource) -> Result<Self, IndexEventError> {
        let rows = source.read_events()?;
        Ok(Self::from_rows(rows))
    }

    /// Rows without a trade date are unresolved and dropped silently; rows
    /// with no announcement or an announcement not before the trade date are
    /// dropped with a warning.
    pub fn from_rows(rows: impl IntoIterator<Item = EventRow>) -> Self {
        let mut events: HashMap<String, Vec<EventWindow>> = HashMap::new();
        let mut dropped = 0usize;

        for row in rows {
            let Some(trade_date) = row.trade_date else {
                continue;
            };
            let symbol = normalize_symbol(&row.ticker);
            if symbol.is_empty() {
                warn!(ticker = %row.ticker, "skipping event row with empty ticker");
                dropped += 1;
                continue;
            }
            let Some(announcement_date) = row.announced else {
                warn!(symbol, "skipping event row without announcement date");
                dropped += 1;
                continue;
            };
            if announcement_date >= trade_date {
                warn!(
                    symbol,
                    %announcement_date,
                    %trade_date,
                    "skipping event row: announcement not before trade date"
                );
                dropped += 1;
                continue;
            }
            events
                .entry(symbol.to_string())
                .or_default()
                .push(EventWindow {
                    announcement_date,
                    trade_date,
                });
        }

        debug!(symbols = events.len(), dropped, "event calendar built");
        Self { events }
    }

    /// Windows for `symbol` in source order; empty for unknown symbols.
    pub fn lookup(&self, symbol: &str) -> &[EventWindow] {
        self.events.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn symbol_count(&self) -> usize {
        self.events.len()
    }

    pub fn window_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Symbols in sorted order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.events.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}
