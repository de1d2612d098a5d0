//! Daily bar and quote representation.

use chrono::{NaiveDate, NaiveDateTime};

use super::instrument::InstrumentId;

/// Bar subscription key. Only daily bars built from last prices are used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarType {
    pub instrument: InstrumentId,
    pub step: u32,
    pub aggregation: BarAggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarAggregation {
    Day,
}

impl BarType {
    pub fn daily(instrument: InstrumentId) -> Self {
        Self {
            instrument,
            step: 1,
            aggregation: BarAggregation::Day,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub instrument: InstrumentId,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Calendar day of the bar, time-of-day dropped.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// (open - close) / close, the bar's own open measured against its close.
    pub fn open_close_change(&self) -> f64 {
        (self.open - self.close) / self.close
    }
}

/// Top-of-book quote, used as a sizing price fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteTick {
    pub instrument: InstrumentId,
    pub bid: f64,
    pub ask: f64,
}
