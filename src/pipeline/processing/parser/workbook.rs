use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::{debug, error, info};

use super::{Cell, Table};
use crate::error::{DashboardError, Result};

/// Read the first worksheet of an Excel file (xlsx, xls, xlsb, ods).
/// The first row is taken as the header.
pub fn read_first_sheet(path: &Path) -> Result<Table> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| {
        error!("Failed to open workbook {}: {}", path.display(), e);
        DashboardError::parse(format!("failed to open workbook: {}", e))
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DashboardError::parse("workbook contains no sheets"))?;

    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        error!("Failed to read sheet '{}': {}", sheet_name, e);
        DashboardError::parse(format!("failed to read sheet '{}': {}", sheet_name, e))
    })?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Ok(Table::default()),
    };
    debug!("Columns: {:?}", headers);

    let rows: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(convert_cell).collect()).collect();
    info!("Read {} rows from sheet '{}'", rows.len(), sheet_name);

    Ok(Table::new(headers, rows))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Cell::DateTime(round_to_second(ts)),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}

/// Spreadsheet serials carry float noise below one second
fn round_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    let nanos = ts.nanosecond();
    let base = ts.with_nanosecond(0).unwrap_or(ts);
    if nanos >= 500_000_000 {
        base + Duration::seconds(1)
    } else {
        base
    }
}
