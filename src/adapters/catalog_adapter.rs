//! CSV catalog data adapter.
//!
//! Layout:
//! - `_instruments.csv`: `symbol,tick_size,lot_size,max_size,min_size,margin`
//! - `<SYMBOL>.csv`: `open_time,open,high,low,close,volume`, one row per day
//!
//! Files whose name starts with `_` are never treated as price series.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::bar::Bar;
use crate::domain::error::IndexEventError;
use crate::domain::instrument::{Instrument, InstrumentId, Venue};
use crate::ports::data_port::DataPort;

pub const INSTRUMENTS_FILE: &str = "_instruments.csv";

#[derive(Debug, Deserialize)]
struct InstrumentRow {
    symbol: String,
    #[serde(default)]
    tick_size: Option<f64>,
    #[serde(default)]
    lot_size: Option<f64>,
    #[serde(default)]
    max_size: Option<f64>,
    #[serde(default)]
    min_size: Option<f64>,
    #[serde(default)]
    margin: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BarRow {
    open_time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

pub struct CatalogAdapter {
    base_path: PathBuf,
    venue: Venue,
    currency: String,
}

/// Parse a bar timestamp: RFC 3339 (offset dropped), `YYYY-MM-DD HH:MM:SS`,
/// or a bare date at midnight.
pub fn parse_open_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn whole(value: Option<f64>, default: u64) -> u64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v as u64,
        _ => default,
    }
}

impl CatalogAdapter {
    pub fn new(base_path: impl Into<PathBuf>, venue: Venue, currency: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            venue,
            currency: currency.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn series_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn to_instrument(&self, row: InstrumentRow) -> Result<Instrument, String> {
        let symbol = row.symbol.trim();
        if symbol.is_empty() {
            return Err("empty symbol".into());
        }
        let tick_size = row.tick_size.unwrap_or(0.01);
        if !(tick_size > 0.0) {
            return Err(format!("invalid tick_size {tick_size}"));
        }
        Ok(Instrument {
            id: InstrumentId::new(symbol, self.venue.clone()),
            currency: self.currency.clone(),
            tick_size,
            lot_size: whole(row.lot_size, 1).max(1),
            min_quantity: whole(row.min_size, 1),
            max_quantity: whole(row.max_size, 0),
            margin: row.margin.unwrap_or(0.0),
        })
    }
}

impl DataPort for CatalogAdapter {
    fn load_instruments(&self) -> Result<Vec<Instrument>, IndexEventError> {
        let path = self.base_path.join(INSTRUMENTS_FILE);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| {
            IndexEventError::data_load(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut instruments = Vec::new();
        for (line, result) in rdr.deserialize::<InstrumentRow>().enumerate() {
            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(|row| self.to_instrument(row));
            match parsed {
                Ok(inst) => instruments.push(inst),
                Err(reason) => warn!(row = line + 1, "skipping instrument row: {reason}"),
            }
        }
        debug!(count = instruments.len(), "loaded instruments");
        Ok(instruments)
    }

    fn list_series(&self) -> Result<Vec<String>, IndexEventError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            IndexEventError::data_load(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| IndexEventError::data_load(format!("directory entry error: {e}")))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.starts_with('_') {
                continue;
            }
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn fetch_bars(&self, instrument: &Instrument) -> Result<Vec<Bar>, IndexEventError> {
        let path = self.series_path(&instrument.id.symbol);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| {
            IndexEventError::data_load(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut bars = Vec::new();
        for result in rdr.deserialize::<BarRow>() {
            let row = result.map_err(|e| {
                IndexEventError::data_load(format!("CSV parse error in {}: {}", path.display(), e))
            })?;
            let timestamp = parse_open_time(&row.open_time).ok_or_else(|| {
                IndexEventError::data_load(format!("invalid open_time '{}'", row.open_time))
            })?;
            bars.push(Bar {
                instrument: instrument.id.clone(),
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.unwrap_or(0.0),
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
