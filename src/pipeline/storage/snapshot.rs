use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::app::ports::ClockPort;
use crate::constants::{SNAPSHOT_DATE_FORMAT, SNAPSHOT_TIMESTAMP_FORMAT};
use crate::error::{DashboardError, Result};
use crate::observability::metrics;
use crate::pipeline::processing::normalize::{normalize_date, DateInput};
use crate::types::{ApplicationRecord, Dataset, Decision, Source};

/// Result of a snapshot read. Reads never fail; anything unusable is a miss.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Dataset),
    Miss(MissReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MissReason {
    NotFound,
    Stale { cached: NaiveDate, expected: NaiveDate },
    Corrupt(String),
}

impl MissReason {
    fn label(&self) -> &'static str {
        match self {
            MissReason::NotFound => "not_found",
            MissReason::Stale { .. } => "stale",
            MissReason::Corrupt(_) => "corrupt",
        }
    }
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissReason::NotFound => write!(f, "no snapshot file"),
            MissReason::Stale { cached, expected } => {
                write!(f, "snapshot is for {}, need {}", cached, expected)
            }
            MissReason::Corrupt(reason) => write!(f, "unusable snapshot: {}", reason),
        }
    }
}

#[derive(Error, Debug)]
enum CacheDecodeError {
    #[error("unreadable snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad snapshot date {0:?}")]
    Date(String),
    #[error("column {column} has {found} values, expected {expected}")]
    ColumnLength {
        column: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },
}

/// On-disk layout: `{"date": "YYYY-MM-DD", "data": {<column>: [values]}}`
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile<D> {
    date: String,
    data: D,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotColumns {
    #[serde(rename = "Дата")]
    date: Vec<Option<String>>,
    #[serde(rename = "Номер", default)]
    number: Vec<Option<String>>,
    #[serde(rename = "Филиал")]
    branch: Vec<Option<String>>,
    #[serde(rename = "Клиент", default)]
    client: Vec<Option<String>>,
    #[serde(rename = "Менеджер", default, skip_serializing_if = "Option::is_none")]
    manager: Option<Vec<Option<String>>>,
    #[serde(rename = "Результат", default, skip_serializing_if = "Option::is_none")]
    result: Option<Vec<Option<String>>>,
}

impl SnapshotColumns {
    fn from_dataset(dataset: &Dataset) -> Self {
        let records = &dataset.records;
        let optional = |values: Vec<Option<String>>| {
            if values.iter().any(Option::is_some) {
                Some(values)
            } else {
                None
            }
        };
        SnapshotColumns {
            date: records
                .iter()
                .map(|r| Some(r.date.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string()))
                .collect(),
            number: records.iter().map(|r| r.number.clone()).collect(),
            branch: records.iter().map(|r| Some(r.branch.clone())).collect(),
            client: records.iter().map(|r| r.client.clone()).collect(),
            manager: optional(records.iter().map(|r| r.manager.clone()).collect()),
            result: optional(
                records
                    .iter()
                    .map(|r| r.result.as_ref().map(|d| d.label().to_string()))
                    .collect(),
            ),
        }
    }

    fn into_records(self) -> std::result::Result<Vec<ApplicationRecord>, CacheDecodeError> {
        let expected = self.date.len();
        check_len("Филиал", self.branch.len(), expected)?;
        let number = pad_or_check("Номер", self.number, expected)?;
        let client = pad_or_check("Клиент", self.client, expected)?;
        let manager = pad_or_check("Менеджер", self.manager.unwrap_or_default(), expected)?;
        let result = pad_or_check("Результат", self.result.unwrap_or_default(), expected)?;

        let mut records = Vec::with_capacity(expected);
        let rows = self
            .date
            .into_iter()
            .zip(self.branch)
            .zip(number)
            .zip(client)
            .zip(manager)
            .zip(result)
            .enumerate();
        for (row, (((((date, branch), number), client), manager), result)) in rows {
            let input = date.map(DateInput::Raw).unwrap_or(DateInput::Missing);
            let date = normalize_date(&input)
                .map_err(|e| CacheDecodeError::Row {
                    row,
                    reason: e.to_string(),
                })?
                .ok_or_else(|| CacheDecodeError::Row {
                    row,
                    reason: "missing date".to_string(),
                })?;
            let branch = branch.ok_or_else(|| CacheDecodeError::Row {
                row,
                reason: "missing branch".to_string(),
            })?;
            records.push(ApplicationRecord {
                date,
                branch,
                manager,
                client,
                result: result.as_deref().map(Decision::from_label),
                number,
            });
        }
        Ok(records)
    }
}

fn check_len(
    column: &'static str,
    found: usize,
    expected: usize,
) -> std::result::Result<(), CacheDecodeError> {
    if found == expected {
        Ok(())
    } else {
        Err(CacheDecodeError::ColumnLength {
            column,
            found,
            expected,
        })
    }
}

/// Optional columns may be absent entirely; present ones must line up.
fn pad_or_check(
    column: &'static str,
    values: Vec<Option<String>>,
    expected: usize,
) -> std::result::Result<Vec<Option<String>>, CacheDecodeError> {
    if values.is_empty() {
        return Ok(vec![None; expected]);
    }
    check_len(column, values.len(), expected)?;
    Ok(values)
}

/// Single-file snapshot of one source's dataset, valid for exactly one day.
///
/// A snapshot saved "now" represents yesterday and is served back only while
/// yesterday is still yesterday.
pub struct SnapshotCache {
    path: PathBuf,
    source: Source,
    clock: Arc<dyn ClockPort>,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>, source: Source, clock: Arc<dyn ClockPort>) -> Self {
        let path = path.into();
        info!("Snapshot cache initialized with file: {}", path.display());
        Self {
            path,
            source,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the snapshot with `dataset`, tagged as yesterday's data.
    /// The file is replaced by rename so readers never see a partial write.
    pub fn save(&self, dataset: &Dataset) -> Result<()> {
        info!("Saving {} records to snapshot", dataset.len());
        match self.write_snapshot(dataset) {
            Ok(()) => {
                metrics::cache::write_success();
                info!("Snapshot saved to {}", self.path.display());
                Ok(())
            }
            Err(e) => {
                metrics::cache::write_error();
                error!("Failed to save snapshot {}: {}", self.path.display(), e);
                Err(e)
            }
        }
    }

    fn write_snapshot(&self, dataset: &Dataset) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file = SnapshotFile {
            date: self.clock.yesterday().format(SNAPSHOT_DATE_FORMAT).to_string(),
            data: SnapshotColumns::from_dataset(dataset),
        };
        let bytes = serde_json::to_vec(&file)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| DashboardError::Io(e.error))?;
        Ok(())
    }

    /// Read the snapshot if it represents yesterday.
    pub fn load(&self) -> CacheLookup {
        info!("Trying to read snapshot {}", self.path.display());
        let lookup = match self.read_snapshot() {
            Ok(lookup) => lookup,
            Err(CacheDecodeError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                warn!("Snapshot file not found");
                CacheLookup::Miss(MissReason::NotFound)
            }
            Err(e) => {
                error!("Discarding unusable snapshot: {}", e);
                CacheLookup::Miss(MissReason::Corrupt(e.to_string()))
            }
        };

        match &lookup {
            CacheLookup::Hit(ds) => {
                metrics::cache::hit();
                info!("Snapshot is current, {} records", ds.len());
            }
            CacheLookup::Miss(reason) => metrics::cache::miss(reason.label()),
        }
        lookup
    }

    fn read_snapshot(&self) -> std::result::Result<CacheLookup, CacheDecodeError> {
        let bytes = fs::read(&self.path)?;
        let file: SnapshotFile<serde_json::Value> = serde_json::from_slice(&bytes)?;

        let cached = NaiveDate::parse_from_str(&file.date, SNAPSHOT_DATE_FORMAT)
            .map_err(|_| CacheDecodeError::Date(file.date.clone()))?;
        let expected = self.clock.yesterday();
        if cached != expected {
            info!(
                "Snapshot is stale. Cached date: {}, required: {}",
                cached, expected
            );
            return Ok(CacheLookup::Miss(MissReason::Stale { cached, expected }));
        }

        let columns: SnapshotColumns = serde_json::from_value(file.data)?;
        let records = columns.into_records()?;
        Ok(CacheLookup::Hit(Dataset::new(self.source, records)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::FixedClock;
    use tempfile::tempdir;

    fn clock(y: i32, m: u32, d: u32) -> Arc<dyn ClockPort> {
        Arc::new(FixedClock::at_noon(NaiveDate::from_ymd_opt(y, m, d).unwrap()))
    }

    fn sample() -> Dataset {
        let date = NaiveDate::from_ymd_opt(2024, 12, 8)
            .unwrap()
            .and_hms_opt(9, 42, 48)
            .unwrap();
        Dataset::new(
            Source::BackOffice,
            vec![ApplicationRecord {
                date,
                branch: "Спитамен".into(),
                manager: None,
                client: Some("Иванов".into()),
                result: None,
                number: Some("0001".into()),
            }],
        )
    }

    #[test]
    fn test_save_writes_yesterday_tag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache").join("yesterday_data.json");
        let cache = SnapshotCache::new(&path, Source::BackOffice, clock(2024, 12, 9));
        cache.save(&sample()).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["date"], "2024-12-08");
        assert_eq!(raw["data"]["Дата"][0], "2024-12-08 09:42:48");
        assert_eq!(raw["data"]["Филиал"][0], "Спитамен");
        assert!(raw["data"].get("Менеджер").is_none());
    }

    #[test]
    fn test_fractional_seconds_survive_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let cache = SnapshotCache::new(&path, Source::BackOffice, clock(2024, 12, 9));
        let mut dataset = sample();
        dataset.records[0].date = NaiveDate::from_ymd_opt(2024, 12, 8)
            .unwrap()
            .and_hms_milli_opt(9, 37, 3, 250)
            .unwrap();
        cache.save(&dataset).unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["data"]["Дата"][0], "2024-12-08 09:37:03.250");
        assert_eq!(cache.load(), CacheLookup::Hit(dataset));
    }

    #[test]
    fn test_missing_file_is_miss() {
        let dir = tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("none.json"), Source::BackOffice, clock(2024, 12, 9));
        assert_eq!(cache.load(), CacheLookup::Miss(MissReason::NotFound));
    }

    #[test]
    fn test_garbage_is_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.json");
        fs::write(&path, b"{not json").unwrap();
        let cache = SnapshotCache::new(&path, Source::BackOffice, clock(2024, 12, 9));
        assert!(matches!(cache.load(), CacheLookup::Miss(MissReason::Corrupt(_))));
    }

    #[test]
    fn test_unparseable_row_date_is_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.json");
        fs::write(
            &path,
            r#"{"date":"2024-12-08","data":{"Дата":["garbage"],"Филиал":["Спитамен"]}}"#,
        )
        .unwrap();
        let cache = SnapshotCache::new(&path, Source::BackOffice, clock(2024, 12, 9));
        assert!(matches!(cache.load(), CacheLookup::Miss(MissReason::Corrupt(_))));
    }

    #[test]
    fn test_ragged_columns_are_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.json");
        fs::write(
            &path,
            r#"{"date":"2024-12-08","data":{"Дата":["2024-12-08 10:00:00"],"Филиал":[]}}"#,
        )
        .unwrap();
        let cache = SnapshotCache::new(&path, Source::BackOffice, clock(2024, 12, 9));
        assert!(matches!(cache.load(), CacheLookup::Miss(MissReason::Corrupt(_))));
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let cache = SnapshotCache::new(&path, Source::BackOffice, clock(2024, 12, 9));
        cache.save(&sample()).unwrap();
        cache.save(&Dataset::empty(Source::BackOffice)).unwrap();

        match cache.load() {
            CacheLookup::Hit(ds) => assert!(ds.is_empty()),
            other => panic!("expected hit, got {:?}", other),
        }
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
