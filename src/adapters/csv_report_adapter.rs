//! CSV report adapter: `order_fills.csv`, `positions.csv`, `account.csv`.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::account::AccountSnapshot;
use crate::domain::error::IndexEventError;
use crate::domain::order::OrderFill;
use crate::domain::position::ClosedPosition;
use crate::ports::report_port::ReportPort;

pub const ORDER_FILLS_FILE: &str = "order_fills.csv";
pub const POSITIONS_FILE: &str = "positions.csv";
pub const ACCOUNT_FILE: &str = "account.csv";

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Serialize)]
struct FillRow {
    order_id: u64,
    position_id: u64,
    instrument_id: String,
    side: String,
    quantity: u64,
    price: f64,
    commission: Decimal,
    ts_event: String,
}

#[derive(Serialize)]
struct PositionRow {
    position_id: u64,
    instrument_id: String,
    side: &'static str,
    peak_qty: u64,
    avg_px_open: f64,
    avg_px_close: f64,
    ts_opened: String,
    ts_closed: String,
    commissions: Decimal,
    realized_pnl: Decimal,
}

#[derive(Serialize)]
struct AccountRow {
    ts_event: String,
    total: Decimal,
    locked: Decimal,
    free: Decimal,
    equity: Decimal,
}

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_rows<T: Serialize>(
        &self,
        file_name: &str,
        rows: impl IntoIterator<Item = T>,
    ) -> Result<(), IndexEventError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        let mut wtr = csv::Writer::from_path(&path).map_err(csv_to_io)?;
        let mut count = 0usize;
        for row in rows {
            wtr.serialize(row).map_err(csv_to_io)?;
            count += 1;
        }
        wtr.flush()?;
        info!(path = %path.display(), rows = count, "report written");
        Ok(())
    }
}

fn csv_to_io(err: csv::Error) -> IndexEventError {
    IndexEventError::Io(std::io::Error::other(err))
}

impl ReportPort for CsvReportAdapter {
    fn write_order_fills(&self, fills: &[OrderFill]) -> Result<(), IndexEventError> {
        self.write_rows(
            ORDER_FILLS_FILE,
            fills.iter().map(|f| FillRow {
                order_id: f.order_id,
                position_id: f.position_id,
                instrument_id: f.instrument.to_string(),
                side: f.side.to_string(),
                quantity: f.quantity,
                price: f.price,
                commission: f.commission,
                ts_event: f.timestamp.format(TS_FORMAT).to_string(),
            }),
        )
    }

    fn write_positions(&self, positions: &[ClosedPosition]) -> Result<(), IndexEventError> {
        self.write_rows(
            POSITIONS_FILE,
            positions.iter().map(|p| PositionRow {
                position_id: p.position_id,
                instrument_id: p.instrument.to_string(),
                side: if p.quantity >= 0 { "LONG" } else { "SHORT" },
                peak_qty: p.quantity.unsigned_abs(),
                avg_px_open: p.avg_px_open,
                avg_px_close: p.avg_px_close,
                ts_opened: p.opened_at.format(TS_FORMAT).to_string(),
                ts_closed: p.closed_at.format(TS_FORMAT).to_string(),
                commissions: p.commissions,
                realized_pnl: p.realized_pnl,
            }),
        )
    }

    fn write_account(&self, history: &[AccountSnapshot]) -> Result<(), IndexEventError> {
        self.write_rows(
            ACCOUNT_FILE,
            history.iter().map(|s| AccountRow {
                ts_event: s.timestamp.format(TS_FORMAT).to_string(),
                total: s.total,
                locked: s.locked,
                free: s.free,
                equity: s.equity,
            }),
        )
    }
}
