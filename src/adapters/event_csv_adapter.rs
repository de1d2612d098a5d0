//! Index-change event table read from CSV.
//!
//! Required columns (header match is case-insensitive): `Ticker`,
//! `Announced`, `Trade Date`. Other columns are ignored. Blank or unparseable
//! date cells become `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::error::IndexEventError;
use crate::ports::event_port::{EventRow, EventSource};

pub const TICKER_COLUMN: &str = "Ticker";
pub const ANNOUNCED_COLUMN: &str = "Announced";
pub const TRADE_DATE_COLUMN: &str = "Trade Date";

pub struct CsvEventSource {
    path: PathBuf,
}

/// Accepts `2024-03-01`, `03/01/2024`, `2024-03-01 16:00:00`,
/// `2024-03-01T16:00:00` and RFC 3339 (offset dropped, wall-clock date kept).
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_local().date())
}

impl CsvEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, IndexEventError> {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| IndexEventError::data_load(format!("missing required column '{name}'")))
    }
}

impl EventSource for CsvEventSource {
    fn read_events(&self) -> Result<Vec<EventRow>, IndexEventError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| {
                IndexEventError::data_load(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| IndexEventError::data_load(format!("CSV header error: {e}")))?
            .clone();
        let ticker_idx = Self::column(&headers, TICKER_COLUMN)?;
        let announced_idx = Self::column(&headers, ANNOUNCED_COLUMN)?;
        let trade_idx = Self::column(&headers, TRADE_DATE_COLUMN)?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| IndexEventError::data_load(format!("CSV parse error: {e}")))?;
            rows.push(EventRow {
                ticker: record.get(ticker_idx).unwrap_or("").trim().to_string(),
                announced: record.get(announced_idx).and_then(parse_event_date),
                trade_date: record.get(trade_idx).and_then(parse_event_date),
            });
        }

        debug!(path = %self.path.display(), rows = rows.len(), "read event table");
        Ok(rows)
    }
}
