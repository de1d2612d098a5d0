//! Core domain types and logic.

pub mod account;
pub mod backtest;
pub mod bar;
pub mod calendar;
pub mod config_validation;
pub mod error;
pub mod event_strategy;
pub mod instrument;
pub mod order;
pub mod position;
pub mod position_state;
pub mod signal;
pub mod sizing;
pub mod strategy;
