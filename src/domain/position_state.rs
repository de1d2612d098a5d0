//! Per-instrument position bookkeeping owned by the strategy controller.
//!
//! Two maps keyed by symbol: entry prices and the active event (signal state
//! carrying the trade date). An entry means the controller believes it holds
//! a position opened on an event.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::order::OrderSide;
use super::signal::SignalState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub entry_price: f64,
    pub active_trade_date: Option<NaiveDate>,
}

/// Outcome of a risk check against the recorded entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskExit {
    TakeProfit { pnl: f64 },
    StopLoss { pnl: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLimits {
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl RiskLimits {
    /// `pnl = (close - entry) / entry`; take-profit wins when both could fire.
    pub fn check(&self, entry_price: f64, close: f64) -> Option<RiskExit> {
        if entry_price <= 0.0 {
            return None;
        }
        let pnl = (close - entry_price) / entry_price;
        if pnl >= self.take_profit {
            Some(RiskExit::TakeProfit { pnl })
        } else if pnl <= -self.stop_loss {
            Some(RiskExit::StopLoss { pnl })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    entry_prices: HashMap<String, f64>,
    active_events: HashMap<String, SignalState>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, symbol: &str, entry_price: f64, side: OrderSide, trade_date: NaiveDate) {
        self.entry_prices.insert(symbol.to_string(), entry_price);
        self.active_events
            .insert(symbol.to_string(), SignalState::entered(side, trade_date));
    }

    pub fn get(&self, symbol: &str) -> Option<PositionState> {
        let entry_price = *self.entry_prices.get(symbol)?;
        Some(PositionState {
            entry_price,
            active_trade_date: self.active_trade_date(symbol),
        })
    }

    /// Idle unless an event position is being tracked.
    pub fn signal_state(&self, symbol: &str) -> SignalState {
        self.active_events.get(symbol).copied().unwrap_or_default()
    }

    pub fn entry_price(&self, symbol: &str) -> Option<f64> {
        self.entry_prices.get(symbol).copied()
    }

    pub fn active_trade_date(&self, symbol: &str) -> Option<NaiveDate> {
        self.active_events
            .get(symbol)
            .and_then(SignalState::active_trade_date)
    }

    pub fn clear(&mut self, symbol: &str) -> Option<PositionState> {
        let state = self.get(symbol);
        self.entry_prices.remove(symbol);
        self.active_events.remove(symbol);
        state
    }

    pub fn clear_all(&mut self) {
        self.entry_prices.clear();
        self.active_events.clear();
    }

    pub fn len(&self) -> usize {
        self.entry_prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_prices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RiskLimits {
        RiskLimits {
            take_profit: 0.03,
            stop_loss: 0.05,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn take_profit_fires_at_threshold() {
        match limits().check(100.0, 104.0) {
            Some(RiskExit::TakeProfit { pnl }) => assert!((pnl - 0.04).abs() < 1e-12),
            other => panic!("expected take-profit, got {:?}", other),
        }
        assert!(matches!(
            limits().check(100.0, 103.0),
            Some(RiskExit::TakeProfit { .. })
        ));
    }

    #[test]
    fn stop_loss_fires_below_threshold() {
        match limits().check(100.0, 94.0) {
            Some(RiskExit::StopLoss { pnl }) => assert!((pnl + 0.06).abs() < 1e-12),
            other => panic!("expected stop-loss, got {:?}", other),
        }
        assert!(matches!(
            limits().check(100.0, 95.0),
            Some(RiskExit::StopLoss { .. })
        ));
    }

    #[test]
    fn inside_band_no_exit() {
        assert_eq!(limits().check(100.0, 101.0), None);
        assert_eq!(limits().check(100.0, 96.0), None);
    }

    #[test]
    fn zero_entry_price_never_exits() {
        assert_eq!(limits().check(0.0, 50.0), None);
    }

    #[test]
    fn open_get_clear() {
        let mut t = PositionTracker::new();
        assert!(t.is_empty());
        t.open("AAPL", 100.0, OrderSide::Buy, d(2024, 3, 15));

        let state = t.get("AAPL").unwrap();
        assert_eq!(state.entry_price, 100.0);
        assert_eq!(state.active_trade_date, Some(d(2024, 3, 15)));
        assert_eq!(t.len(), 1);

        assert_eq!(
            t.signal_state("AAPL"),
            SignalState::ActiveLong {
                trade_date: d(2024, 3, 15)
            }
        );

        let cleared = t.clear("AAPL");
        assert_eq!(cleared, Some(state));
        assert!(t.get("AAPL").is_none());
        assert!(t.active_trade_date("AAPL").is_none());
        assert_eq!(t.signal_state("AAPL"), SignalState::Idle);
    }

    #[test]
    fn reopen_overwrites() {
        let mut t = PositionTracker::new();
        t.open("AAPL", 100.0, OrderSide::Buy, d(2024, 3, 15));
        t.open("AAPL", 90.0, OrderSide::Sell, d(2024, 6, 20));
        assert_eq!(t.entry_price("AAPL"), Some(90.0));
        assert_eq!(t.active_trade_date("AAPL"), Some(d(2024, 6, 20)));
        assert!(matches!(t.signal_state("AAPL"), SignalState::ActiveShort { .. }));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn clear_all_empties_both_maps() {
        let mut t = PositionTracker::new();
        t.open("AAPL", 100.0, OrderSide::Buy, d(2024, 3, 15));
        t.open("MSFT", 300.0, OrderSide::Sell, d(2024, 4, 19));
        t.clear_all();
        assert!(t.is_empty());
        assert!(t.active_trade_date("MSFT").is_none());
    }
}
