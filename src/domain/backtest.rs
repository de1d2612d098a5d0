//! Backtest engine and event loop.
//!
//! Replays bars from every instrument in timestamp order against a venue,
//! delivering subscribed bars to the strategy.

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::domain::account::AccountSnapshot;
use crate::domain::bar::Bar;
use crate::domain::error::IndexEventError;
use crate::domain::order::OrderFill;
use crate::domain::position::ClosedPosition;
use crate::domain::strategy::Strategy;
use crate::ports::execution_port::{ExecutionPort, MarketReplay};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub bars_processed: usize,
    pub bars_delivered: usize,
    pub trading_days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub fills: Vec<OrderFill>,
    pub positions: Vec<ClosedPosition>,
    pub account_history: Vec<AccountSnapshot>,
}

impl BacktestResult {
    pub fn final_snapshot(&self) -> Option<&AccountSnapshot> {
        self.account_history.last()
    }
}

/// Merge per-instrument series into one timeline. The sort is stable so bars
/// sharing a timestamp keep their input order.
pub fn merge_timeline(series: Vec<Vec<Bar>>) -> Vec<Bar> {
    let mut bars: Vec<Bar> = series.into_iter().flatten().collect();
    bars.sort_by_key(|b| b.timestamp);
    bars
}

/// Run `strategy` over `bars` on `venue`.
///
/// `start` and `stop` are always paired once `start` succeeds. If a bar
/// handler fails the loop ends, `stop` still runs, and the handler's error is
/// returned. A failing `stop` is returned as is.
pub fn run_backtest<V>(
    strategy: &mut dyn Strategy,
    venue: &mut V,
    bars: Vec<Bar>,
) -> Result<BacktestResult, IndexEventError>
where
    V: ExecutionPort + MarketReplay,
{
    let bars = merge_timeline(vec![bars]);
    strategy.start(venue)?;

    let mut bars_delivered = 0usize;
    let mut trading_days = 0usize;
    let mut current_day: Option<NaiveDate> = None;
    let mut first_date = None;
    let mut loop_error = None;

    for bar in &bars {
        let day = bar.date();
        if current_day != Some(day) {
            if let Some(prev) = current_day {
                venue.close_day(prev);
            }
            current_day = Some(day);
            first_date.get_or_insert(day);
            trading_days += 1;
        }

        venue.update_market(bar);
        if !venue.is_subscribed(&bar.instrument) {
            continue;
        }
        bars_delivered += 1;
        if let Err(e) = strategy.handle_bar(bar, venue) {
            error!(instrument = %bar.instrument, date = %day, "bar handler failed: {e}");
            loop_error = Some(e);
            break;
        }
    }

    let stop_result = strategy.stop(venue);
    if let Some(day) = current_day {
        venue.close_day(day);
    }
    if let Some(e) = loop_error {
        if let Err(stop_err) = stop_result {
            error!("stop after failed run also failed: {stop_err}");
        }
        return Err(e);
    }
    stop_result?;

    debug!(bars = bars.len(), delivered = bars_delivered, "replay finished");
    info!(
        days = trading_days,
        fills = venue.fills().len(),
        positions = venue.closed_positions().len(),
        "backtest complete"
    );

    Ok(BacktestResult {
        bars_processed: bars.len(),
        bars_delivered,
        trading_days,
        first_date,
        last_date: current_day,
        fills: venue.fills().to_vec(),
        positions: venue.closed_positions().to_vec(),
        account_history: venue.account_history().to_vec(),
    })
}
