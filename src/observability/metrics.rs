//! Metrics for the dashboard data pipeline
//!
//! Counters and histograms are recorded through the `metrics` facade. Nothing
//! is exported unless a recorder is installed with [`init`].

use std::fmt;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{DashboardError, Result};

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Snapshot cache
    CacheHits,
    CacheMisses,
    CacheWritesSuccess,
    CacheWritesError,

    // Source fetches
    FetchSuccess,
    FetchError,
    FetchDuration,
    FetchRowsIngested,
    FetchPayloadBytes,

    // Back-office transfer
    TransferFallbackUsed,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::CacheHits => "kd_cache_hits_total",
            MetricName::CacheMisses => "kd_cache_misses_total",
            MetricName::CacheWritesSuccess => "kd_cache_writes_success_total",
            MetricName::CacheWritesError => "kd_cache_writes_error_total",
            MetricName::FetchSuccess => "kd_fetch_success_total",
            MetricName::FetchError => "kd_fetch_error_total",
            MetricName::FetchDuration => "kd_fetch_duration_seconds",
            MetricName::FetchRowsIngested => "kd_fetch_rows_ingested_total",
            MetricName::FetchPayloadBytes => "kd_fetch_payload_bytes",
            MetricName::TransferFallbackUsed => "kd_transfer_fallback_used_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            CacheHits,
            CacheMisses,
            CacheWritesSuccess,
            CacheWritesError,
            FetchSuccess,
            FetchError,
            FetchDuration,
            FetchRowsIngested,
            FetchPayloadBytes,
            TransferFallbackUsed,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Install the Prometheus recorder and return a handle for rendering
pub fn init() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| DashboardError::Config(format!("Failed to install Prometheus recorder: {}", e)))?;
    info!("Metrics recorder installed");
    Ok(handle)
}

// ============================================================================
// Snapshot cache
// ============================================================================

pub mod cache {
    use super::MetricName;

    pub fn hit() {
        ::metrics::counter!(MetricName::CacheHits.as_str()).increment(1);
    }

    pub fn miss(reason: &'static str) {
        ::metrics::counter!(MetricName::CacheMisses.as_str(), "reason" => reason).increment(1);
    }

    pub fn write_success() {
        ::metrics::counter!(MetricName::CacheWritesSuccess.as_str()).increment(1);
    }

    pub fn write_error() {
        ::metrics::counter!(MetricName::CacheWritesError.as_str()).increment(1);
    }
}

// ============================================================================
// Source fetches
// ============================================================================

pub mod fetch {
    use super::MetricName;
    use crate::types::Source;

    pub fn success(source: Source, rows: usize) {
        let label = source.to_string();
        ::metrics::counter!(MetricName::FetchSuccess.as_str(), "source" => label.clone()).increment(1);
        ::metrics::counter!(MetricName::FetchRowsIngested.as_str(), "source" => label)
            .increment(rows as u64);
    }

    pub fn error(source: Source, kind: &'static str) {
        ::metrics::counter!(
            MetricName::FetchError.as_str(),
            "source" => source.to_string(),
            "kind" => kind
        )
        .increment(1);
    }

    pub fn duration(source: Source, secs: f64) {
        ::metrics::histogram!(MetricName::FetchDuration.as_str(), "source" => source.to_string())
            .record(secs);
    }

    pub fn payload_bytes(bytes: usize) {
        ::metrics::histogram!(MetricName::FetchPayloadBytes.as_str()).record(bytes as f64);
    }

    pub fn fallback_used() {
        ::metrics::counter!(MetricName::TransferFallbackUsed.as_str()).increment(1);
    }
}
