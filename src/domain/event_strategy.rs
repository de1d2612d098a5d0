//! Index-event strategy controller.
//!
//! On start, loads the event calendar and subscribes to daily bars for every
//! configured instrument that has at least one event window. Each bar runs
//! the risk check against the recorded entry price, then the event state
//! machine in [`crate::domain::signal`]. On stop, every open position at the
//! venue is closed.

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::domain::bar::{Bar, BarType};
use crate::domain::calendar::{EventCalendar, EventWindow};
use crate::domain::error::IndexEventError;
use crate::domain::instrument::InstrumentId;
use crate::domain::order::{MarketOrder, OrderSide};
use crate::domain::position_state::{PositionState, PositionTracker, RiskExit, RiskLimits};
use crate::domain::signal::{Signal, SignalEvaluator, SignalState};
use crate::domain::sizing::OrderSizer;
use crate::domain::strategy::{EventStrategyConfig, Strategy};
use crate::ports::event_port::EventSource;
use crate::ports::execution_port::ExecutionPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Running,
    Stopped,
}

pub struct EventDrivenStrategy {
    config: EventStrategyConfig,
    source: Box<dyn EventSource>,
    calendar: EventCalendar,
    evaluator: SignalEvaluator,
    sizer: OrderSizer,
    risk: RiskLimits,
    positions: PositionTracker,
    subscribed: Vec<InstrumentId>,
    lifecycle: Lifecycle,
}

impl EventDrivenStrategy {
    pub fn new(
        config: EventStrategyConfig,
        source: Box<dyn EventSource>,
    ) -> Result<Self, IndexEventError> {
        let ratio = Decimal::try_from(config.max_position_ratio).map_err(|e| {
            IndexEventError::ConfigInvalid {
                section: "strategy".into(),
                key: "max_position_ratio".into(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            evaluator: SignalEvaluator::new(config.price_change_threshold),
            sizer: OrderSizer::new(ratio, config.trade_size),
            risk: RiskLimits {
                take_profit: config.take_profit,
                stop_loss: config.stop_loss,
            },
            config,
            source,
            calendar: EventCalendar::default(),
            positions: PositionTracker::new(),
            subscribed: Vec::new(),
            lifecycle: Lifecycle::Uninitialized,
        })
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    pub fn subscribed(&self) -> &[InstrumentId] {
        &self.subscribed
    }

    pub fn position_state(&self, symbol: &str) -> Option<PositionState> {
        self.positions.get(symbol)
    }

    pub fn signal_state(&self, symbol: &str) -> SignalState {
        self.positions.signal_state(symbol)
    }

    fn check_risk(
        &mut self,
        bar: &Bar,
        ctx: &mut dyn ExecutionPort,
    ) -> Result<(), IndexEventError> {
        let symbol = bar.instrument.symbol.as_str();
        let Some(entry_price) = self.positions.entry_price(symbol) else {
            return Ok(());
        };
        if ctx.position(&bar.instrument).is_none() {
            return Ok(());
        }

        match self.risk.check(entry_price, bar.close) {
            Some(RiskExit::TakeProfit { pnl }) => {
                ctx.close_position(&bar.instrument)?;
                info!(
                    symbol,
                    "take-profit exit (profit {:.2}% >= {:.2}%)",
                    pnl * 100.0,
                    self.risk.take_profit * 100.0
                );
                self.positions.clear(symbol);
            }
            Some(RiskExit::StopLoss { pnl }) => {
                ctx.close_position(&bar.instrument)?;
                info!(
                    symbol,
                    "stop-loss exit (loss {:.2}% <= -{:.2}%)",
                    pnl * 100.0,
                    self.risk.stop_loss * 100.0
                );
                self.positions.clear(symbol);
            }
            None => {}
        }
        Ok(())
    }

    fn enter(
        &mut self,
        bar: &Bar,
        side: OrderSide,
        price_change: f64,
        window: EventWindow,
        ctx: &mut dyn ExecutionPort,
    ) -> Result<(), IndexEventError> {
        let symbol = bar.instrument.symbol.as_str();
        let quantity = match self.sizer.size_order(side, &bar.instrument, Some(bar.close), &*ctx) {
            Ok(0) => {
                warn!(symbol, "calculated trade size is 0, skipping order");
                return Ok(());
            }
            Ok(q) => q,
            Err(degeneracy) => {
                warn!(symbol, %degeneracy, "calculated trade size is 0, skipping order");
                return Ok(());
            }
        };

        let order = MarketOrder {
            instrument: bar.instrument.clone(),
            side,
            quantity,
        };
        if let Err(e) = ctx.submit_market_order(order) {
            warn!(symbol, %e, "order rejected, skipping entry");
            return Ok(());
        }
        self.positions.open(symbol, bar.close, side, window.trade_date);
        info!(
            symbol,
            %side,
            quantity,
            trade_date = %window.trade_date,
            "{} signal (price change {:.2}%)",
            side,
            price_change * 100.0
        );
        Ok(())
    }

    fn exit_scheduled(
        &mut self,
        bar: &Bar,
        ctx: &mut dyn ExecutionPort,
    ) -> Result<(), IndexEventError> {
        let symbol = bar.instrument.symbol.as_str();
        if ctx.position(&bar.instrument).is_some() {
            ctx.close_position(&bar.instrument)?;
            info!(symbol, "exit position (day after index adjustment)");
        }
        self.positions.clear(symbol);
        Ok(())
    }
}

impl Strategy for EventDrivenStrategy {
    fn start(&mut self, ctx: &mut dyn ExecutionPort) -> Result<(), IndexEventError> {
        self.calendar = EventCalendar::load(self.source.as_ref())?;
        self.subscribed.clear();

        for instrument in &self.config.instrument_ids {
            let windows = self.calendar.lookup(&instrument.symbol);
            if windows.is_empty() {
                continue;
            }
            ctx.subscribe_bars(BarType::daily(instrument.clone()));
            info!(
                symbol = %instrument.symbol,
                events = windows.len(),
                "subscribed to event trading opportunities"
            );
            self.subscribed.push(instrument.clone());
        }

        info!(
            instruments = self.subscribed.len(),
            "monitoring event opportunities"
        );
        self.lifecycle = Lifecycle::Running;
        Ok(())
    }

    fn handle_bar(
        &mut self,
        bar: &Bar,
        ctx: &mut dyn ExecutionPort,
    ) -> Result<(), IndexEventError> {
        if self.lifecycle != Lifecycle::Running {
            debug!(instrument = %bar.instrument, "bar ignored, strategy not running");
            return Ok(());
        }

        self.check_risk(bar, ctx)?;

        let symbol = bar.instrument.symbol.as_str();
        let windows = self.calendar.lookup(symbol);
        if windows.is_empty() {
            return Ok(());
        }

        let state = self.positions.signal_state(symbol);
        match self.evaluator.evaluate(state, bar, windows) {
            Signal::Hold => {}
            Signal::BelowThreshold { price_change } => {
                debug!(
                    symbol,
                    "price change {:.2}% within threshold",
                    price_change * 100.0
                );
            }
            Signal::Enter {
                side,
                price_change,
                window,
            } => self.enter(bar, side, price_change, window, ctx)?,
            Signal::ScheduledExit { .. } => self.exit_scheduled(bar, ctx)?,
        }
        Ok(())
    }

    fn stop(&mut self, ctx: &mut dyn ExecutionPort) -> Result<(), IndexEventError> {
        self.lifecycle = Lifecycle::Stopped;

        let open_positions = ctx.open_positions();
        if open_positions.is_empty() {
            info!("strategy stopped: no positions to clean up");
            self.positions.clear_all();
            return Ok(());
        }

        let total = open_positions.len();
        info!(total, "starting cleanup of open positions");
        for (dispatched, position) in open_positions.iter().enumerate() {
            if let Err(e) = ctx.close_position(&position.instrument) {
                error!(
                    instrument = %position.instrument,
                    error = %e,
                    "error occurred during position cleanup"
                );
                self.positions.clear_all();
                return Err(IndexEventError::Cleanup {
                    dispatched,
                    total,
                    source: Box::new(e),
                });
            }
            info!(
                instrument = %position.instrument,
                quantity = position.quantity,
                "sent close instruction"
            );
        }

        self.positions.clear_all();
        info!(total, "all position close instructions sent");
        Ok(())
    }
}
