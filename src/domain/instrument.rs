//! Instrument identifiers and metadata.

use std::fmt;

/// Simulated trading counterparty, e.g. `SIM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Venue(pub String);

impl Venue {
    pub fn new(name: impl Into<String>) -> Self {
        Venue(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `SYMBOL.VENUE`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId {
    pub symbol: String,
    pub venue: Venue,
}

impl InstrumentId {
    pub fn new(symbol: impl Into<String>, venue: Venue) -> Self {
        Self {
            symbol: symbol.into(),
            venue,
        }
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}

/// Equity metadata read from the catalog's instrument table.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub id: InstrumentId,
    pub currency: String,
    pub tick_size: f64,
    pub lot_size: u64,
    pub min_quantity: u64,
    pub max_quantity: u64,
    pub margin: f64,
}

impl Instrument {
    /// Clamp a requested quantity to whole lots within the instrument limits.
    /// Returns 0 when the request cannot satisfy the minimum.
    pub fn normalize_quantity(&self, quantity: u64) -> u64 {
        let lot = self.lot_size.max(1);
        let mut q = (quantity / lot) * lot;
        if self.max_quantity > 0 {
            q = q.min((self.max_quantity / lot) * lot);
        }
        if q < self.min_quantity { 0 } else { q }
    }
}
