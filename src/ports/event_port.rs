//! Event table access port trait.

use chrono::NaiveDate;

use crate::domain::error::IndexEventError;

/// One row of the index-change table, dates already parsed.
///
/// `trade_date` is `None` while the change is announced but not yet effective.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub ticker: String,
    pub announced: Option<NaiveDate>,
    pub trade_date: Option<NaiveDate>,
}

pub trait EventSource {
    /// Fails with [`IndexEventError::DataLoad`] when the table is unreadable or
    /// lacks a required column.
    fn read_events(&self) -> Result<Vec<EventRow>, IndexEventError>;
}
