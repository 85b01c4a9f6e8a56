// Pipeline storage: the on-disk snapshot of the back-office dataset

pub mod snapshot;

pub use snapshot::{CacheLookup, MissReason, SnapshotCache};
