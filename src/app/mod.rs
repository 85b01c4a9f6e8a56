pub mod ports;
pub mod reconcile_use_case;

pub use reconcile_use_case::{BackOfficeOrigin, DatasetReconciler, Reconciliation};
