//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::catalog_adapter::CatalogAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::event_csv_adapter::CsvEventSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sim_exchange::{SimExchangeConfig, SimulatedExchange};
use crate::domain::backtest::{self as backtest_engine, BacktestResult, merge_timeline};
use crate::domain::bar::Bar;
use crate::domain::calendar::EventCalendar;
use crate::domain::config_validation::{
    DEFAULT_BASE_CURRENCY, DEFAULT_COMMISSION_PER_SHARE, DEFAULT_RESULT_DIR,
    DEFAULT_STARTING_BALANCE, DEFAULT_VENUE, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::IndexEventError;
use crate::domain::event_strategy::EventDrivenStrategy;
use crate::domain::instrument::{Instrument, Venue};
use crate::domain::strategy::EventStrategyConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::execution_port::MarketReplay;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "indexevent", about = "Index-change event backtester")]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Results directory, overrides [backtest] result_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the event calendar
    Events {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest { config, output } => run_backtest(&config, output.as_ref()),
        Command::Events { config, symbol } => run_events(&config, symbol.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = IndexEventError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn validate_all(adapter: &FileConfigAdapter) -> Result<(), IndexEventError> {
    validate_backtest_config(adapter)?;
    validate_strategy_config(adapter)
}

fn to_decimal(section: &str, key: &str, value: f64) -> Result<Decimal, IndexEventError> {
    Decimal::try_from(value).map_err(|e| IndexEventError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: e.to_string(),
    })
}

pub fn build_exchange_config(
    adapter: &dyn ConfigPort,
) -> Result<SimExchangeConfig, IndexEventError> {
    let venue = adapter
        .get_string("backtest", "venue")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_VENUE.to_string());
    let base_currency = adapter
        .get_string("backtest", "base_currency")
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string());

    Ok(SimExchangeConfig {
        venue: Venue::new(venue),
        base_currency,
        starting_balance: to_decimal(
            "backtest",
            "starting_balance",
            adapter.get_double("backtest", "starting_balance", DEFAULT_STARTING_BALANCE),
        )?,
        commission_per_share: to_decimal(
            "backtest",
            "commission_per_share",
            adapter.get_double(
                "backtest",
                "commission_per_share",
                DEFAULT_COMMISSION_PER_SHARE,
            ),
        )?,
    })
}

/// Strategy parameters from `[strategy]`. Instruments are filled in once the
/// catalog has been read.
pub fn build_strategy_config(
    adapter: &FileConfigAdapter,
) -> Result<EventStrategyConfig, IndexEventError> {
    let defaults = EventStrategyConfig::default();
    let event_file_path =
        adapter
            .get_path("strategy", "event_file_path")
            .ok_or_else(|| IndexEventError::ConfigMissing {
                section: "strategy".into(),
                key: "event_file_path".into(),
            })?;
    let trade_size = adapter.get_int("strategy", "trade_size", defaults.trade_size as i64);

    Ok(EventStrategyConfig {
        instrument_ids: Vec::new(),
        event_file_path,
        price_change_threshold: adapter.get_double(
            "strategy",
            "price_change_threshold",
            defaults.price_change_threshold,
        ),
        max_position_ratio: adapter.get_double(
            "strategy",
            "max_position_ratio",
            defaults.max_position_ratio,
        ),
        trade_size: u64::try_from(trade_size).map_err(|_| IndexEventError::ConfigInvalid {
            section: "strategy".into(),
            key: "trade_size".into(),
            reason: "trade_size must be at least 1".into(),
        })?,
        stop_loss: adapter.get_double("strategy", "stop_loss", defaults.stop_loss),
        take_profit: adapter.get_double("strategy", "take_profit", defaults.take_profit),
    })
}

/// Pick the instruments to trade: those with both metadata and a price
/// series, narrowed to `requested` when given. Series without metadata and
/// requested symbols missing from the catalog are skipped with a warning.
pub fn resolve_instruments(
    instruments: Vec<Instrument>,
    series: &[String],
    requested: Option<&[String]>,
) -> Vec<Instrument> {
    let known: HashSet<&str> = instruments.iter().map(|i| i.id.symbol.as_str()).collect();
    for symbol in series {
        if !known.contains(symbol.as_str()) {
            warn!(symbol = %symbol, "no instrument metadata for price series, skipping");
        }
    }

    let with_series: HashSet<&str> = series.iter().map(String::as_str).collect();
    let wanted: Option<HashSet<&str>> =
        requested.map(|r| r.iter().map(String::as_str).collect());
    if let Some(wanted) = &wanted {
        for symbol in wanted {
            if !known.contains(symbol) || !with_series.contains(symbol) {
                warn!(symbol = %symbol, "requested instrument not in catalog, skipping");
            }
        }
    }

    instruments
        .into_iter()
        .filter(|i| with_series.contains(i.id.symbol.as_str()))
        .filter(|i| {
            wanted
                .as_ref()
                .is_none_or(|w| w.contains(i.id.symbol.as_str()))
        })
        .collect()
}

/// Load bars for each instrument; failed series are logged and dropped.
/// Returns the instruments that produced data and the merged timeline.
pub fn load_market_data(
    data_port: &dyn DataPort,
    instruments: Vec<Instrument>,
) -> Result<(Vec<Instrument>, Vec<Bar>), IndexEventError> {
    let mut loaded = Vec::with_capacity(instruments.len());
    let mut series = Vec::with_capacity(instruments.len());

    for instrument in instruments {
        match data_port.fetch_bars(&instrument) {
            Ok(bars) if bars.is_empty() => {
                warn!(instrument = %instrument.id, "empty price series, skipping");
            }
            Ok(bars) => {
                info!(instrument = %instrument.id, bars = bars.len(), "loaded price series");
                series.push(bars);
                loaded.push(instrument);
            }
            Err(e) => warn!(instrument = %instrument.id, "failed to load price series: {e}"),
        }
    }

    if loaded.is_empty() {
        return Err(IndexEventError::NoData {
            reason: "no instrument has usable price data".into(),
        });
    }
    Ok((loaded, merge_timeline(series)))
}

/// Catalog read for a run: metadata, series listing, selection, bars.
pub fn prepare_market_data(
    data_port: &dyn DataPort,
    requested: Option<&[String]>,
) -> Result<(Vec<Instrument>, Vec<Bar>), IndexEventError> {
    let instruments = data_port.load_instruments()?;
    let series = data_port.list_series()?;
    let selected = resolve_instruments(instruments, &series, requested);
    load_market_data(data_port, selected)
}

fn print_summary(result: &BacktestResult, starting_balance: Decimal) {
    eprintln!("\n=== Backtest Results ===");
    match (result.first_date, result.last_date) {
        (Some(first), Some(last)) => eprintln!("Period:           {first} to {last}"),
        _ => eprintln!("Period:           (no bars)"),
    }
    eprintln!("Trading Days:     {}", result.trading_days);
    eprintln!(
        "Bars:             {} ({} delivered)",
        result.bars_processed, result.bars_delivered
    );
    eprintln!("Fills:            {}", result.fills.len());
    eprintln!("Closed Positions: {}", result.positions.len());
    let realized: Decimal = result.positions.iter().map(|p| p.realized_pnl).sum();
    eprintln!("Realized PnL:     {}", realized.round_dp(2));
    if let Some(last) = result.final_snapshot() {
        eprintln!("Final Equity:     {}", last.equity.round_dp(2));
        if starting_balance > Decimal::ZERO {
            let ret = (last.equity - starting_balance) / starting_balance * Decimal::ONE_HUNDRED;
            eprintln!("Total Return:     {}%", ret.round_dp(2));
        }
    }
}

fn write_reports(
    report: &dyn ReportPort,
    exchange: &SimulatedExchange,
) -> Result<(), IndexEventError> {
    report.write_order_fills(exchange.fills())?;
    report.write_positions(exchange.closed_positions())?;
    report.write_account(exchange.account_history())
}

fn run_backtest(config_path: &PathBuf, output_path: Option<&PathBuf>) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let exchange_config = match build_exchange_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let mut strategy_config = match build_strategy_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: Read the catalog
    let Some(catalog_dir) = adapter.get_path("backtest", "catalog_dir") else {
        let e = IndexEventError::ConfigMissing {
            section: "backtest".into(),
            key: "catalog_dir".into(),
        };
        eprintln!("error: {e}");
        return (&e).into();
    };
    let catalog = CatalogAdapter::new(
        catalog_dir,
        exchange_config.venue.clone(),
        exchange_config.base_currency.clone(),
    );
    let requested = adapter.get_list("strategy", "instruments");
    let (instruments, bars) = match prepare_market_data(&catalog, requested.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Build strategy and venue
    strategy_config.instrument_ids = instruments.iter().map(|i| i.id.clone()).collect();
    let source = CsvEventSource::new(&strategy_config.event_file_path);
    let mut strategy = match EventDrivenStrategy::new(strategy_config, Box::new(source)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let starting_balance = exchange_config.starting_balance;
    let instrument_count = instruments.len();
    let mut exchange = SimulatedExchange::new(exchange_config);
    for instrument in instruments {
        exchange.add_instrument(instrument);
    }

    // Stage 4: Run
    eprintln!(
        "Running backtest: {} instruments, {} bars",
        instrument_count,
        bars.len()
    );
    let outcome = backtest_engine::run_backtest(&mut strategy, &mut exchange, bars);

    // Stage 5: Reports are written even when the run ended abnormally.
    let output_dir = output_path
        .cloned()
        .or_else(|| adapter.get_path("backtest", "result_dir"))
        .unwrap_or_else(|| default_result_dir(adapter.base_dir()));
    let report = CsvReportAdapter::new(&output_dir);
    if let Err(e) = write_reports(&report, &exchange) {
        eprintln!("error: failed to write reports: {e}");
        if outcome.is_ok() {
            return (&e).into();
        }
    }

    match outcome {
        Ok(result) => {
            print_summary(&result, starting_balance);
            eprintln!("\nReports written to: {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: backtest terminated abnormally: {e}");
            (&e).into()
        }
    }
}

fn default_result_dir(base: Option<&Path>) -> PathBuf {
    match base {
        Some(dir) => dir.join(DEFAULT_RESULT_DIR),
        None => PathBuf::from(DEFAULT_RESULT_DIR),
    }
}

fn run_events(config_path: &PathBuf, symbol: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let Some(path) = adapter.get_path("strategy", "event_file_path") else {
        let e = IndexEventError::ConfigMissing {
            section: "strategy".into(),
            key: "event_file_path".into(),
        };
        eprintln!("error: {e}");
        return (&e).into();
    };

    let calendar = match EventCalendar::load(&CsvEventSource::new(&path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbols: Vec<&str> = match symbol {
        Some(s) => vec![s],
        None => calendar.symbols(),
    };
    for s in &symbols {
        let windows = calendar.lookup(s);
        if windows.is_empty() {
            eprintln!("{s}: no events");
            continue;
        }
        for w in windows {
            println!("{s}\t{}\t{}", w.announcement_date, w.trade_date);
        }
    }
    eprintln!(
        "{} symbols, {} event windows",
        calendar.symbol_count(),
        calendar.window_count()
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_all(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let exchange = match build_exchange_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let strategy = match build_strategy_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nVenue:            {}", exchange.venue);
    eprintln!(
        "Starting Balance: {} {}",
        exchange.starting_balance, exchange.base_currency
    );
    eprintln!("Commission/Share: {}", exchange.commission_per_share);
    eprintln!("\nEvent File:       {}", strategy.event_file_path.display());
    eprintln!(
        "Threshold:        {:.2}%",
        strategy.price_change_threshold * 100.0
    );
    eprintln!("Trade Size:       {}", strategy.trade_size);
    eprintln!(
        "Max Position:     {:.1}% of free balance",
        strategy.max_position_ratio * 100.0
    );
    eprintln!(
        "Stop/Take:        -{:.1}% / +{:.1}%",
        strategy.stop_loss * 100.0,
        strategy.take_profit * 100.0
    );
    if let Some(list) = adapter.get_list("strategy", "instruments") {
        eprintln!("Instruments:      {}", list.join(", "));
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
