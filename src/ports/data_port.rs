//! Market data catalog port trait.

use crate::domain::bar::Bar;
use crate::domain::error::IndexEventError;
use crate::domain::instrument::Instrument;

pub trait DataPort {
    /// Instrument metadata. Rows that fail to parse are skipped by the
    /// implementation; an unreadable table is an error.
    fn load_instruments(&self) -> Result<Vec<Instrument>, IndexEventError>;

    /// Symbols with a price series in the catalog, sorted.
    fn list_series(&self) -> Result<Vec<String>, IndexEventError>;

    /// Daily bars for `instrument` in ascending time order.
    fn fetch_bars(&self, instrument: &Instrument) -> Result<Vec<Bar>, IndexEventError>;
}
