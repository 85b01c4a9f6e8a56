//! Derived figures for display. Nothing here is stored.

pub mod dashboard;
pub mod period;
pub mod stats;

pub use dashboard::DashboardReport;
pub use period::Period;
pub use stats::{BranchMetrics, BranchTrend, ComparisonEntry, RateBand};
