//! Strategy lifecycle interface and event strategy configuration.

use std::path::PathBuf;

use crate::domain::bar::Bar;
use crate::domain::error::IndexEventError;
use crate::domain::instrument::InstrumentId;
use crate::ports::execution_port::ExecutionPort;

/// Hooks invoked by the hosting engine, one call at a time.
pub trait Strategy {
    fn start(&mut self, ctx: &mut dyn ExecutionPort) -> Result<(), IndexEventError>;

    fn handle_bar(&mut self, bar: &Bar, ctx: &mut dyn ExecutionPort)
    -> Result<(), IndexEventError>;

    /// An error here means shutdown was not clean; the host must record it.
    fn stop(&mut self, ctx: &mut dyn ExecutionPort) -> Result<(), IndexEventError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventStrategyConfig {
    pub instrument_ids: Vec<InstrumentId>,
    pub event_file_path: PathBuf,
    pub price_change_threshold: f64,
    pub max_position_ratio: f64,
    pub trade_size: u64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Default for EventStrategyConfig {
    fn default() -> Self {
        EventStrategyConfig {
            instrument_ids: Vec::new(),
            event_file_path: PathBuf::from("index_add_events.csv"),
            price_change_threshold: 0.01,
            max_position_ratio: 0.1,
            trade_size: 1000,
            stop_loss: 0.05,
            take_profit: 0.03,
        }
    }
}
