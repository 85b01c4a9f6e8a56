// Data processing pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod processing;
pub mod storage;

// Re-export key types and functions from each stage
pub use ingestion::RemoteDatasetFetcher;
pub use processing::{normalize, parser};
pub use storage::{CacheLookup, MissReason, SnapshotCache};
