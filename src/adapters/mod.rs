//! Concrete adapter implementations for ports.

pub mod catalog_adapter;
pub mod csv_report_adapter;
pub mod event_csv_adapter;
pub mod file_config_adapter;
pub mod sim_exchange;
