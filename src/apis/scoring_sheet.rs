use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::app::ports::DatasetSource;
use crate::config::{required, ScoringConfig};
use crate::constants::{COL_BRANCH, COL_DATE, COL_MANAGER, COL_NUMBER, COL_RESULT};
use crate::error::{DashboardError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::normalize::normalize_column;
use crate::pipeline::processing::parser::{Cell, Table};
use crate::types::{ApplicationRecord, Dataset, Decision, Source};

/// Body of a `values.get` response
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

enum Credential {
    Bearer(String),
    ApiKey(String),
}

/// Reads the scoring worksheet through the spreadsheet values API.
///
/// The first row is the header; every following row is one application.
/// This source is never cached.
pub struct ScoringSheetClient {
    client: Client,
    url: Url,
    credential: Credential,
}

impl ScoringSheetClient {
    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        let spreadsheet_id = required(&config.spreadsheet_id, "SHEETS_SPREADSHEET_ID")?;
        let credential = match (&config.access_token, &config.api_key) {
            (Some(token), _) => Credential::Bearer(token.clone()),
            (None, Some(key)) => Credential::ApiKey(key.clone()),
            (None, None) => {
                return Err(DashboardError::Config(
                    "missing required setting SHEETS_ACCESS_TOKEN or SHEETS_API_KEY".into(),
                ))
            }
        };

        let url = values_url(&config.base_url, spreadsheet_id, &config.worksheet)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url,
            credential,
        })
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub fn fetch(&self) -> Result<Dataset> {
        let started = Instant::now();
        let result = self.download().and_then(|rows| rows_to_dataset(&rows));
        metrics::fetch::duration(Source::Scoring, started.elapsed().as_secs_f64());

        match result {
            Ok(dataset) => {
                metrics::fetch::success(Source::Scoring, dataset.len());
                info!("Scoring data loaded, {} records", dataset.len());
                Ok(dataset)
            }
            Err(e) => {
                metrics::fetch::error(Source::Scoring, e.kind());
                error!("Error loading scoring data: {}", e);
                Err(e)
            }
        }
    }

    fn download(&self) -> Result<Vec<Vec<Value>>> {
        let request = self.client.get(self.url.clone());
        let request = match &self.credential {
            Credential::Bearer(token) => request.bearer_auth(token),
            Credential::ApiKey(key) => request.query(&[("key", key)]),
        };

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        metrics::fetch::payload_bytes(body.len());

        if !status.is_success() {
            return Err(DashboardError::Spreadsheet {
                message: format!("HTTP {}: {}", status, body.trim()),
            });
        }

        let range: ValueRange = serde_json::from_str(&body)?;
        debug!("Received {} rows including header", range.values.len());
        Ok(range.values)
    }
}

impl DatasetSource for ScoringSheetClient {
    fn source(&self) -> Source {
        Source::Scoring
    }

    fn fetch(&self) -> Result<Dataset> {
        ScoringSheetClient::fetch(self)
    }
}

fn values_url(base: &str, spreadsheet_id: &str, worksheet: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| DashboardError::Config(format!("invalid SHEETS_BASE_URL {:?}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| DashboardError::Config(format!("SHEETS_BASE_URL {:?} cannot be a base", base)))?
        .pop_if_empty()
        .push(spreadsheet_id)
        .push("values")
        .push(worksheet);
    Ok(url)
}

fn to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::String(s) => Cell::text(s.as_str()),
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::Bool(b) => Cell::text(b.to_string()),
        other => Cell::text(other.to_string()),
    }
}

/// Header row plus records; short rows are padded with empty cells.
fn rows_to_table(rows: &[Vec<Value>]) -> Result<Table> {
    let (header, body) = rows
        .split_first()
        .ok_or_else(|| DashboardError::parse("scoring worksheet has no header row"))?;
    let headers: Vec<String> = header
        .iter()
        .map(|v| to_cell(v).as_text().unwrap_or_default())
        .collect();
    let width = headers.len();
    let rows = body
        .iter()
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().take(width).map(to_cell).collect();
            cells.resize(width, Cell::Empty);
            cells
        })
        .collect();
    Ok(Table::new(headers, rows).without_blank_rows())
}

fn rows_to_dataset(rows: &[Vec<Value>]) -> Result<Dataset> {
    let table = rows_to_table(rows)?;
    let column = |name: &str| {
        table.column_index(name).ok_or_else(|| {
            DashboardError::parse(format!("column {:?} not found in {:?}", name, table.headers))
        })
    };
    let date_col = column(COL_DATE)?;
    let branch_col = column(COL_BRANCH)?;
    let result_col = column(COL_RESULT)?;
    let manager_col = table.column_index(COL_MANAGER);
    let number_col = table.column_index(COL_NUMBER);

    let inputs: Vec<_> = (0..table.len())
        .map(|row| table.cell(row, date_col).as_date_input())
        .collect();
    let dates = normalize_column(&inputs)?;

    let mut records = Vec::with_capacity(table.len());
    for (row, date) in dates.into_iter().enumerate() {
        let date = date.ok_or_else(|| {
            DashboardError::parse(format!("row {} has no date", table.sheet_row(row)))
        })?;
        let text_at = |col: Option<usize>| col.and_then(|c| table.cell(row, c).as_text());

        records.push(ApplicationRecord {
            date,
            branch: text_at(Some(branch_col)).unwrap_or_default(),
            manager: text_at(manager_col),
            client: None,
            result: text_at(Some(result_col)).map(|s| Decision::from_label(&s)),
            number: text_at(number_col),
        });
    }
    Ok(Dataset::new(Source::Scoring, records))
}
