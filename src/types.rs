use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{RESULT_APPROVED, RESULT_REJECTED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Scoring,
    BackOffice,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Scoring => write!(f, "scoring"),
            Source::BackOffice => write!(f, "back_office"),
        }
    }
}

/// Outcome of a scoring decision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
    /// Any other status text, kept verbatim. Counts towards totals only.
    Other(String),
}

impl Decision {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            RESULT_APPROVED => Decision::Approved,
            RESULT_REJECTED => Decision::Rejected,
            other => Decision::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Decision::Approved => RESULT_APPROVED,
            Decision::Rejected => RESULT_REJECTED,
            Decision::Other(s) => s,
        }
    }
}

/// One loan application after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub date: NaiveDateTime,
    pub branch: String,
    pub manager: Option<String>,
    pub client: Option<String>,
    pub result: Option<Decision>,
    pub number: Option<String>,
}

impl ApplicationRecord {
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

/// Ordered records from a single source. Filtering yields a new dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub source: Source,
    pub records: Vec<ApplicationRecord>,
}

impl Dataset {
    pub fn new(source: Source, records: Vec<ApplicationRecord>) -> Self {
        Self { source, records }
    }

    pub fn empty(source: Source) -> Self {
        Self::new(source, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApplicationRecord> {
        self.records.iter()
    }

    pub fn filter<F>(&self, predicate: F) -> Dataset
    where
        F: Fn(&ApplicationRecord) -> bool,
    {
        Dataset {
            source: self.source,
            records: self.records.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    pub fn on_day(&self, day: NaiveDate) -> Dataset {
        self.filter(|r| r.day() == day)
    }

    pub fn for_branch(&self, branch: &str) -> Dataset {
        self.filter(|r| r.branch == branch)
    }

    /// Distinct branch names in first-appearance order
    pub fn branches(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for record in &self.records {
            if !seen.iter().any(|b| b == &record.branch) {
                seen.push(record.branch.clone());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, branch: &str) -> ApplicationRecord {
        ApplicationRecord {
            date: NaiveDate::from_ymd_opt(2024, 12, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            branch: branch.to_string(),
            manager: None,
            client: None,
            result: None,
            number: None,
        }
    }

    #[test]
    fn test_decision_from_label() {
        assert_eq!(Decision::from_label("Одобрено"), Decision::Approved);
        assert_eq!(Decision::from_label(" Отказано "), Decision::Rejected);
        assert_eq!(
            Decision::from_label("На рассмотрении"),
            Decision::Other("На рассмотрении".to_string())
        );
    }

    #[test]
    fn test_filter_returns_new_dataset() {
        let ds = Dataset::new(
            Source::Scoring,
            vec![record(8, "Спитамен"), record(9, "Панчакент"), record(8, "Панчакент")],
        );
        let day = ds.on_day(NaiveDate::from_ymd_opt(2024, 12, 8).unwrap());
        assert_eq!(day.len(), 2);
        assert_eq!(ds.len(), 3);
        assert_eq!(day.source, Source::Scoring);
    }

    #[test]
    fn test_branches_first_appearance_order() {
        let ds = Dataset::new(
            Source::BackOffice,
            vec![record(8, "B"), record(8, "A"), record(9, "B")],
        );
        assert_eq!(ds.branches(), vec!["B".to_string(), "A".to_string()]);
    }
}
