//! Configuration validation.
//!
//! Validates all config fields before a backtest runs. Defaults used here
//! match the ones the CLI applies when building the run configuration.

use crate::domain::error::IndexEventError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_VENUE: &str = "SIM";
pub const DEFAULT_BASE_CURRENCY: &str = "USD";
pub const DEFAULT_STARTING_BALANCE: f64 = 5_000_000.0;
pub const DEFAULT_COMMISSION_PER_SHARE: f64 = 0.0;
pub const DEFAULT_RESULT_DIR: &str = "backtest_results";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    validate_catalog_dir(config)?;
    validate_venue(config)?;
    validate_starting_balance(config)?;
    validate_commission(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    validate_event_file(config)?;
    validate_threshold(config)?;
    validate_trade_size(config)?;
    validate_position_ratio(config)?;
    validate_stop_loss(config)?;
    validate_take_profit(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> IndexEventError {
    IndexEventError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn require_non_empty(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), IndexEventError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(IndexEventError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_catalog_dir(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    require_non_empty(config, "backtest", "catalog_dir")
}

fn validate_venue(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    match config.get_string("backtest", "venue") {
        Some(v) if v.trim().is_empty() || v.contains('.') => Err(invalid(
            "backtest",
            "venue",
            "venue must be a non-empty name without '.'",
        )),
        _ => Ok(()),
    }
}

fn validate_starting_balance(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    let value = config.get_double("backtest", "starting_balance", DEFAULT_STARTING_BALANCE);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "starting_balance",
            "starting_balance must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    let value = config.get_double(
        "backtest",
        "commission_per_share",
        DEFAULT_COMMISSION_PER_SHARE,
    );
    if value < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_per_share",
            "commission_per_share must be non-negative",
        ));
    }
    Ok(())
}

fn validate_event_file(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    require_non_empty(config, "strategy", "event_file_path")
}

fn validate_threshold(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    let value = config.get_double("strategy", "price_change_threshold", 0.01);
    if value < 0.0 {
        return Err(invalid(
            "strategy",
            "price_change_threshold",
            "price_change_threshold must be non-negative",
        ));
    }
    Ok(())
}

fn validate_trade_size(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    let value = config.get_int("strategy", "trade_size", 1000);
    if value < 1 {
        return Err(invalid(
            "strategy",
            "trade_size",
            "trade_size must be at least 1",
        ));
    }
    Ok(())
}

fn validate_position_ratio(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    let value = config.get_double("strategy", "max_position_ratio", 0.1);
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "strategy",
            "max_position_ratio",
            "max_position_ratio must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_stop_loss(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    let value = config.get_double("strategy", "stop_loss", 0.05);
    if value <= 0.0 {
        return Err(invalid(
            "strategy",
            "stop_loss",
            "stop_loss must be positive",
        ));
    }
    Ok(())
}

fn validate_take_profit(config: &dyn ConfigPort) -> Result<(), IndexEventError> {
    let value = config.get_double("strategy", "take_profit", 0.03);
    if value <= 0.0 {
        return Err(invalid(
            "strategy",
            "take_profit",
            "take_profit must be positive",
        ));
    }
    Ok(())
}
