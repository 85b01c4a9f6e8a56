use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::app::ports::{DatasetSource, FileTransferPort, FileTransferSession};
use crate::constants::{
    BACK_OFFICE_COLUMN_RENAMES, COL_BRANCH, COL_CLIENT, COL_DATE, COL_NUMBER, TABULAR_FILE_PATTERNS,
};
use crate::error::{DashboardError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::normalize::{normalize_column, BranchNormalizer};
use crate::pipeline::processing::parser::{workbook, Cell, Table};
use crate::types::{ApplicationRecord, Dataset, Source};

/// Pulls the back-office export over a file-transfer session and turns it
/// into a normalized dataset.
///
/// The configured file name is tried first. If that retrieval fails, the
/// first listed file matching a known spreadsheet pattern is used instead.
pub struct RemoteDatasetFetcher {
    transport: Arc<dyn FileTransferPort>,
    primary_filename: String,
    branches: BranchNormalizer,
}

struct Download {
    name: String,
    bytes: Vec<u8>,
}

impl RemoteDatasetFetcher {
    pub fn new(transport: Arc<dyn FileTransferPort>, primary_filename: impl Into<String>) -> Self {
        Self {
            transport,
            primary_filename: primary_filename.into(),
            branches: BranchNormalizer::default(),
        }
    }

    #[instrument(skip(self), fields(endpoint = %self.transport.endpoint()))]
    pub fn fetch(&self) -> Result<Dataset> {
        let started = Instant::now();
        let result = self.download().and_then(|d| self.read_download(d));
        metrics::fetch::duration(Source::BackOffice, started.elapsed().as_secs_f64());

        match result {
            Ok(dataset) => {
                metrics::fetch::success(Source::BackOffice, dataset.len());
                info!("Back-office export processed, {} records", dataset.len());
                Ok(dataset)
            }
            Err(e) => {
                metrics::fetch::error(Source::BackOffice, e.kind());
                error!("Failed to read back-office export: {}", e);
                Err(e)
            }
        }
    }

    fn download(&self) -> Result<Download> {
        info!("Starting download from {}", self.transport.endpoint());
        let mut session = self.transport.open_session()?;
        let outcome = self.retrieve_with_fallback(session.as_mut());

        if let Err(e) = session.close() {
            warn!("Failed to close transfer session cleanly: {}", e);
        }
        outcome
    }

    fn retrieve_with_fallback(&self, session: &mut dyn FileTransferSession) -> Result<Download> {
        let files = session.list_files()?;
        debug!("Listed files: {:?}", files);

        info!("Trying to download file: {}", self.primary_filename);
        match session.retrieve(&self.primary_filename) {
            Ok(bytes) => {
                info!("File {} downloaded", self.primary_filename);
                return Ok(Download {
                    name: self.primary_filename.clone(),
                    bytes,
                });
            }
            Err(e) => warn!("Failed to download primary file {}: {}", self.primary_filename, e),
        }

        let candidates = matching_files(&files);
        let Some(fallback) = candidates.first() else {
            error!("No spreadsheet files found. Available files: {:?}", files);
            return Err(DashboardError::NoFileFound { available: files });
        };

        info!("Found alternative spreadsheet files: {:?}", candidates);
        metrics::fetch::fallback_used();
        let bytes = session.retrieve(fallback)?;
        info!("Alternative file {} downloaded", fallback);
        Ok(Download {
            name: fallback.to_string(),
            bytes,
        })
    }

    /// Stage the payload in a temporary file, decode it, then remove the file.
    fn read_download(&self, download: Download) -> Result<Dataset> {
        metrics::fetch::payload_bytes(download.bytes.len());
        let extension = Path::new(&download.name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("xlsx")
            .to_string();

        let mut staged = tempfile::Builder::new()
            .prefix("back_office_")
            .suffix(&format!(".{}", extension))
            .tempfile()?;
        staged.write_all(&download.bytes)?;
        staged.flush()?;
        let staged = staged.into_temp_path();
        info!("Temporary file created: {}", staged.display());

        let parsed = check_not_empty(&staged, &download.name)
            .and_then(|_| workbook::read_first_sheet(&staged))
            .and_then(|table| self.table_to_dataset(table));

        match staged.close() {
            Ok(()) => debug!("Temporary file removed"),
            Err(e) => warn!("Failed to remove temporary file: {}", e),
        }
        parsed
    }

    pub fn table_to_dataset(&self, table: Table) -> Result<Dataset> {
        let mut table = table.without_blank_rows();
        info!("Rows read: {}", table.len());
        table.rename_columns(BACK_OFFICE_COLUMN_RENAMES);

        let date_col = required_column(&table, COL_DATE)?;
        let branch_col = required_column(&table, COL_BRANCH)?;
        let number_col = table.column_index(COL_NUMBER);
        let client_col = table.column_index(COL_CLIENT);

        info!("Converting dates...");
        let inputs: Vec<_> = (0..table.len())
            .map(|row| table.cell(row, date_col).as_date_input())
            .collect();
        let dates = normalize_column(&inputs).map_err(|e| {
            error!("Date conversion failed: {}", e);
            e
        })?;

        info!("Normalizing branch names...");
        let mut records = Vec::with_capacity(table.len());
        for (row, date) in dates.into_iter().enumerate() {
            let date = date.ok_or_else(|| {
                let msg = format!("row {} has no date", table.sheet_row(row));
                error!("{}", msg);
                DashboardError::parse(msg)
            })?;
            let branch = match table.cell(row, branch_col) {
                Cell::Text(s) => self.branches.canonical(s),
                other => other.as_text().unwrap_or_default(),
            };
            let text_at = |col: Option<usize>| col.and_then(|c| table.cell(row, c).as_text());

            records.push(ApplicationRecord {
                date,
                branch,
                manager: None,
                client: text_at(client_col),
                result: None,
                number: text_at(number_col),
            });
        }

        Ok(Dataset::new(Source::BackOffice, records))
    }
}

impl DatasetSource for RemoteDatasetFetcher {
    fn source(&self) -> Source {
        Source::BackOffice
    }

    fn fetch(&self) -> Result<Dataset> {
        RemoteDatasetFetcher::fetch(self)
    }
}

fn matching_files(files: &[String]) -> Vec<&str> {
    let patterns: Vec<glob::Pattern> = TABULAR_FILE_PATTERNS
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();
    let opts = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    files
        .iter()
        .map(String::as_str)
        .filter(|name| patterns.iter().any(|p| p.matches_with(name, opts)))
        .collect()
}

fn check_not_empty(path: &Path, name: &str) -> Result<()> {
    let size = fs::metadata(path)?.len();
    info!("File size: {} bytes", size);
    if size == 0 {
        error!("Downloaded file {} is empty", name);
        return Err(DashboardError::EmptyFile {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn required_column(table: &Table, name: &str) -> Result<usize> {
    table.column_index(name).ok_or_else(|| {
        error!("Column {:?} not found. Columns: {:?}", name, table.headers);
        DashboardError::parse(format!("column {:?} not found in {:?}", name, table.headers))
    })
}
