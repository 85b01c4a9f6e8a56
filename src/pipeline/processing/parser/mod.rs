//! Tabular intermediate shared by the spreadsheet sources.

pub mod workbook;

use chrono::NaiveDateTime;

use crate::pipeline::processing::normalize::DateInput;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text rendering; whole numbers lose their fractional part so that
    /// identifiers like `1042.0` come out as `1042`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::DateTime(ts) => Some(ts.to_string()),
        }
    }

    pub fn as_date_input(&self) -> DateInput {
        match self {
            Cell::Empty => DateInput::Missing,
            Cell::DateTime(ts) => DateInput::Timestamp(*ts),
            Cell::Text(s) => DateInput::Raw(s.clone()),
            Cell::Number(_) => DateInput::Raw(self.as_text().unwrap_or_default()),
        }
    }
}

/// Header row plus data rows. Rows may be shorter than the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    // index each row had in `new`, survives `without_blank_rows`
    origin: Vec<usize>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let origin = (0..rows.len()).collect();
        Self {
            headers,
            rows,
            origin,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Rename headers by exact match; unknown headers are kept.
    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for header in self.headers.iter_mut() {
            if let Some((_, to)) = renames.iter().find(|(from, _)| header.trim() == *from) {
                *header = to.to_string();
            }
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// 1-based sheet row of data row `row`, counting the header row
    pub fn sheet_row(&self, row: usize) -> usize {
        self.origin.get(row).copied().unwrap_or(row) + 2
    }

    /// Drop rows where every cell is empty
    pub fn without_blank_rows(self) -> Table {
        let (rows, origin) = self
            .rows
            .into_iter()
            .zip(self.origin)
            .filter(|(row, _)| row.iter().any(|c| !c.is_empty()))
            .unzip();
        Table {
            headers: self.headers,
            rows,
            origin,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
