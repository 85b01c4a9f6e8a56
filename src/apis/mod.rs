pub mod scoring_sheet;

pub use scoring_sheet::ScoringSheetClient;
