//! Event signal state machine.
//!
//! Each instrument is Idle, or holds a position opened on an event window
//! (ActiveLong / ActiveShort, named after the position held). Transitions:
//!
//! | state   | bar date                      | result                          |
//! |---------|-------------------------------|---------------------------------|
//! | Idle    | announcement + 1, move > thr  | Enter (against the move)        |
//! | Idle    | anything else                 | Hold                            |
//! | Active* | active trade date + 1         | ScheduledExit, back to Idle     |
//! | Active* | anything else                 | Hold                            |
//!
//! Risk exits are checked by the controller before this table is consulted.
//! Dates are compared by exact equality: a bar gap over a trigger date
//! misses the trigger.

use chrono::NaiveDate;

use super::bar::Bar;
use super::calendar::EventWindow;
use super::order::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalState {
    #[default]
    Idle,
    ActiveLong { trade_date: NaiveDate },
    ActiveShort { trade_date: NaiveDate },
}

impl SignalState {
    pub fn entered(side: OrderSide, trade_date: NaiveDate) -> Self {
        match side {
            OrderSide::Buy => SignalState::ActiveLong { trade_date },
            OrderSide::Sell => SignalState::ActiveShort { trade_date },
        }
    }

    pub fn active_trade_date(&self) -> Option<NaiveDate> {
        match self {
            SignalState::Idle => None,
            SignalState::ActiveLong { trade_date } | SignalState::ActiveShort { trade_date } => {
                Some(*trade_date)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Hold,
    Enter {
        side: OrderSide,
        price_change: f64,
        window: EventWindow,
    },
    /// Announcement day matched but the move stayed inside the threshold.
    BelowThreshold { price_change: f64 },
    ScheduledExit { trade_date: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalEvaluator {
    pub price_change_threshold: f64,
}

impl SignalEvaluator {
    pub fn new(price_change_threshold: f64) -> Self {
        Self {
            price_change_threshold,
        }
    }

    pub fn evaluate(&self, state: SignalState, bar: &Bar, windows: &[EventWindow]) -> Signal {
        let today = bar.date();
        match state.active_trade_date() {
            Some(trade_date) => {
                if trade_date.succ_opt() == Some(today) {
                    Signal::ScheduledExit { trade_date }
                } else {
                    Signal::Hold
                }
            }
            None => match windows.iter().find(|w| w.entry_date() == Some(today)) {
                Some(window) => self.on_announcement(bar, *window),
                None => Signal::Hold,
            },
        }
    }

    fn on_announcement(&self, bar: &Bar, window: EventWindow) -> Signal {
        if bar.close <= 0.0 {
            return Signal::Hold;
        }
        let price_change = bar.open_close_change();
        if price_change.abs() > self.price_change_threshold {
            // Trade against the gap: a rise is sold, a drop is bought.
            let side = if price_change > 0.0 {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            };
            Signal::Enter {
                side,
                price_change,
                window,
            }
        } else {
            Signal::BelowThreshold { price_change }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::{InstrumentId, Venue};
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar_on(date: NaiveDate, open: f64, close: f64) -> Bar {
        Bar {
            instrument: InstrumentId::new("AAPL", Venue::new("SIM")),
            timestamp: date.and_hms_opt(16, 0, 0).unwrap(),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 1000.0,
        }
    }

    fn window() -> EventWindow {
        EventWindow {
            announcement_date: d(2024, 3, 4),
            trade_date: d(2024, 3, 15),
        }
    }

    #[test]
    fn drop_on_day_after_announcement_buys() {
        let eval = SignalEvaluator::new(0.01);
        let signal = eval.evaluate(
            SignalState::Idle,
            &bar_on(d(2024, 3, 5), 98.0, 100.0),
            &[window()],
        );
        match signal {
            Signal::Enter {
                side,
                price_change,
                window: w,
            } => {
                assert_eq!(side, OrderSide::Buy);
                assert_relative_eq!(price_change, -0.02, epsilon = 1e-12);
                assert_eq!(w, window());
            }
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[test]
    fn rise_on_day_after_announcement_sells() {
        let eval = SignalEvaluator::new(0.01);
        let signal = eval.evaluate(
            SignalState::Idle,
            &bar_on(d(2024, 3, 5), 103.0, 100.0),
            &[window()],
        );
        assert!(matches!(
            signal,
            Signal::Enter {
                side: OrderSide::Sell,
                ..
            }
        ));
    }

    #[test]
    fn move_at_threshold_does_not_trigger() {
        let eval = SignalEvaluator::new(0.02);
        let signal = eval.evaluate(
            SignalState::Idle,
            &bar_on(d(2024, 3, 5), 98.0, 100.0),
            &[window()],
        );
        assert!(matches!(signal, Signal::BelowThreshold { .. }));
    }

    #[test]
    fn announcement_day_itself_is_ignored() {
        let eval = SignalEvaluator::new(0.01);
        let signal = eval.evaluate(
            SignalState::Idle,
            &bar_on(d(2024, 3, 4), 90.0, 100.0),
            &[window()],
        );
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn no_windows_holds() {
        let eval = SignalEvaluator::new(0.0);
        let signal = eval.evaluate(SignalState::Idle, &bar_on(d(2024, 3, 5), 50.0, 100.0), &[]);
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn active_exits_day_after_trade_date() {
        let eval = SignalEvaluator::new(0.01);
        let state = SignalState::entered(OrderSide::Buy, d(2024, 3, 15));
        let signal = eval.evaluate(state, &bar_on(d(2024, 3, 16), 100.0, 100.0), &[window()]);
        assert_eq!(
            signal,
            Signal::ScheduledExit {
                trade_date: d(2024, 3, 15)
            }
        );
    }

    #[test]
    fn active_ignores_new_announcements() {
        let eval = SignalEvaluator::new(0.01);
        let state = SignalState::entered(OrderSide::Sell, d(2024, 3, 15));
        let second = EventWindow {
            announcement_date: d(2024, 3, 7),
            trade_date: d(2024, 3, 29),
        };
        let signal = eval.evaluate(state, &bar_on(d(2024, 3, 8), 90.0, 100.0), &[window(), second]);
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn first_matching_window_governs() {
        let eval = SignalEvaluator::new(0.01);
        let early_exit = EventWindow {
            announcement_date: d(2024, 3, 4),
            trade_date: d(2024, 3, 8),
        };
        let signal = eval.evaluate(
            SignalState::Idle,
            &bar_on(d(2024, 3, 5), 98.0, 100.0),
            &[early_exit, window()],
        );
        match signal {
            Signal::Enter { window: w, .. } => assert_eq!(w, early_exit),
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[test]
    fn gap_over_trigger_date_is_missed() {
        let eval = SignalEvaluator::new(0.01);
        let signal = eval.evaluate(
            SignalState::Idle,
            &bar_on(d(2024, 3, 6), 90.0, 100.0),
            &[window()],
        );
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn state_helpers() {
        let s = SignalState::entered(OrderSide::Sell, d(2024, 3, 15));
        assert_eq!(s, SignalState::ActiveShort { trade_date: d(2024, 3, 15) });
        assert_eq!(s.active_trade_date(), Some(d(2024, 3, 15)));
        assert_eq!(SignalState::default().active_trade_date(), None);
    }
}
