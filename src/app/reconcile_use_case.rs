use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::app::ports::{ClockPort, DatasetSource};
use crate::error::Result;
use crate::pipeline::storage::{CacheLookup, SnapshotCache};
use crate::report::stats::{self, ComparisonEntry};
use crate::types::Dataset;

/// Where the back-office dataset of a reconciliation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackOfficeOrigin {
    Cache,
    Remote,
}

/// Both datasets of one run, side by side. They are never merged.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub scoring: Dataset,
    pub back_office: Dataset,
    pub back_office_origin: BackOfficeOrigin,
    pub reconciled_at: NaiveDateTime,
}

impl Reconciliation {
    /// Per-branch counts from both sources for one calendar day
    pub fn compare_on(&self, day: NaiveDate) -> Vec<ComparisonEntry> {
        stats::compare(&self.scoring.on_day(day), &self.back_office.on_day(day))
    }
}

/// Use case that loads the scoring dataset fresh and the back-office
/// dataset through the snapshot cache.
pub struct DatasetReconciler {
    scoring: Box<dyn DatasetSource>,
    back_office: Box<dyn DatasetSource>,
    cache: SnapshotCache,
    clock: Arc<dyn ClockPort>,
}

impl DatasetReconciler {
    pub fn new(
        scoring: Box<dyn DatasetSource>,
        back_office: Box<dyn DatasetSource>,
        cache: SnapshotCache,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            scoring,
            back_office,
            cache,
            clock,
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Fetch both datasets. Any fetch failure fails the whole run.
    #[instrument(skip(self))]
    pub fn reconcile(&self) -> Result<Reconciliation> {
        let scoring = self.scoring.fetch().map_err(|e| {
            error!("Reconciliation aborted, {} fetch failed: {}", self.scoring.source(), e);
            e
        })?;

        let (back_office, back_office_origin) = match self.cache.load() {
            CacheLookup::Hit(dataset) => {
                info!("Using cached back-office data");
                (dataset, BackOfficeOrigin::Cache)
            }
            CacheLookup::Miss(reason) => {
                info!("Snapshot miss ({}), loading from remote", reason);
                let dataset = self.fetch_back_office()?;
                if let Err(e) = self.cache.save(&dataset) {
                    warn!("Continuing without snapshot: {}", e);
                }
                (dataset, BackOfficeOrigin::Remote)
            }
        };

        info!(
            "Reconciled {} scoring and {} back-office records",
            scoring.len(),
            back_office.len()
        );
        Ok(Reconciliation {
            scoring,
            back_office,
            back_office_origin,
            reconciled_at: self.clock.now(),
        })
    }

    fn fetch_back_office(&self) -> Result<Dataset> {
        self.back_office.fetch().map_err(|e| {
            error!("Reconciliation aborted, {} fetch failed: {}", self.back_office.source(), e);
            e
        })
    }
}
