#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use kredit_dashboard::app::ports::{FileTransferPort, FileTransferSession};
use kredit_dashboard::error::{DashboardError, Result};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

/// In-memory file server
pub struct FakeTransport {
    files: Vec<(String, Vec<u8>)>,
    sessions: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new(files: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            files: files.into_iter().map(|(n, b)| (n.to_string(), b)).collect(),
            sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn session_counter(&self) -> Arc<AtomicUsize> {
        self.sessions.clone()
    }
}

impl FileTransferPort for FakeTransport {
    fn endpoint(&self) -> String {
        "fake://server".to_string()
    }

    fn open_session(&self) -> Result<Box<dyn FileTransferSession>> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            files: self.files.clone(),
        }))
    }
}

struct FakeSession {
    files: Vec<(String, Vec<u8>)>,
}

impl FileTransferSession for FakeSession {
    fn list_files(&mut self) -> Result<Vec<String>> {
        Ok(self.files.iter().map(|(n, _)| n.clone()).collect())
    }

    fn retrieve(&mut self, name: &str) -> Result<Vec<u8>> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| DashboardError::transport(format!("retrieve {}", name), "550 file not found"))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

pub struct ExportRow<'a> {
    pub date: &'a str,
    pub number: f64,
    pub organization: &'a str,
    pub partner: &'a str,
}

/// A back-office export as the accounting system writes it, dates as text
pub fn back_office_xlsx(rows: &[ExportRow]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in ["Дата", "Номер", "Организация", "Партнер", "Сумма"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, row.date).unwrap();
        sheet.write_number(r, 1, row.number).unwrap();
        sheet.write_string(r, 2, row.organization).unwrap();
        sheet.write_string(r, 3, row.partner).unwrap();
        sheet.write_number(r, 4, 1500.0).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// Same layout, but the date column holds native spreadsheet datetimes
pub fn back_office_xlsx_native_dates(dates: &[&str]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let format = Format::new().set_num_format("dd.mm.yyyy hh:mm:ss");
    for (col, header) in ["Дата", "Номер", "Организация", "Партнер"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, date) in dates.iter().enumerate() {
        let r = i as u32 + 1;
        let dt = ExcelDateTime::parse_from_str(date).unwrap();
        sheet.write_datetime_with_format(r, 0, &dt, &format).unwrap();
        sheet.write_number(r, 1, r as f64).unwrap();
        sheet.write_string(r, 2, "шахри Панчакент").unwrap();
        sheet.write_string(r, 3, "Клиент").unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

pub fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// Writer that keeps everything a subscriber prints
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
