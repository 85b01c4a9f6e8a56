//! Field normalizers applied while turning source tables into records.

pub mod branches;
pub mod dates;

pub use branches::BranchNormalizer;
pub use dates::{normalize_column, normalize_date, DateInput};
